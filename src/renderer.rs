//! wgpu implementation of [`RenderSurface`].
//!
//! Each scene gets its own GPU resources, created in [`RenderSurface::prepare`]
//! and dropped in [`RenderSurface::release`]. A frame is two passes: the 3D
//! pass (clear, skybox, background image, lit meshes) and the overlay pass.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::{Mat4, Vec3};

use crate::assets::FontAtlas;
use crate::config::ExhibitConfig;
use crate::draw2d::Draw2d;
use crate::environment::MeshFlags;
use crate::geometry::{Material, RawGeometry};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform};
use crate::mesh_pass::{DrawCall, MeshPass, SceneUniforms};
use crate::scene::{Scene, SceneId};
use crate::skybox::{SkyUniforms, SkyboxPass};
use crate::surface::RenderSurface;
use crate::texture::{Panorama, Texture};
use crate::ui::{Color, ElementKind, Overlay, Rect};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create the window surface")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open the GPU device")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("the surface reports no texture format")]
    NoSurfaceFormat,
    #[error("failed to read font {path}")]
    FontIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {message}")]
    Font { path: PathBuf, message: String },
    #[error("failed to load image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// One drawable environment node.
struct GpuNode {
    mesh: Mesh,
    model: Mat4,
    color: Color,
    texture: Option<usize>,
    double_sided: bool,
}

/// A texture together with the bind group that samples it.
struct BoundTexture {
    #[allow(dead_code)]
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Default)]
struct SceneResources {
    nodes: Vec<GpuNode>,
    /// Indexed like [`Scene::images`].
    textures: Vec<BoundTexture>,
    skybox: Option<BoundTexture>,
    /// Mean radiance of the skybox, tints the ambient term.
    environment: Vec3,
    background: Option<BoundTexture>,
}

pub struct WgpuRenderer {
    gpu: GpuContext,
    mesh_pass: MeshPass,
    skybox_pass: SkyboxPass,
    draw2d: Draw2d,
    font: Option<FontAtlas>,
    scenes: HashMap<SceneId, SceneResources>,
}

impl WgpuRenderer {
    /// Create the passes and load the overlay font. A missing font only
    /// disables overlay text.
    pub fn new(gpu: GpuContext, config: &ExhibitConfig) -> Self {
        let mesh_pass = MeshPass::new(&gpu);
        let skybox_pass = SkyboxPass::new(&gpu);
        let mut draw2d = Draw2d::new(&gpu);

        let font_path = config.asset_path(&config.assets.font);
        let font = match FontAtlas::load(&gpu, &font_path, config.assets.font_size) {
            Ok(font) => {
                draw2d.set_font(&gpu, &font);
                Some(font)
            }
            Err(err) => {
                tracing::warn!("Overlay text disabled: {err}");
                None
            }
        };

        Self {
            gpu,
            mesh_pass,
            skybox_pass,
            draw2d,
            font,
            scenes: HashMap::new(),
        }
    }

    fn upload(&self, scene: &Scene) -> SceneResources {
        let gpu = &self.gpu;
        let mut resources = SceneResources::default();

        for (index, image) in scene.images.iter().enumerate() {
            let texture = Texture::from_image(gpu, image, &format!("{} image {index}", scene.id));
            let bind_group = self.mesh_pass.create_texture_bind_group(gpu, &texture);
            resources.textures.push(BoundTexture {
                texture,
                bind_group,
            });
        }

        let mut query = scene
            .world
            .query::<(&Transform, &std::sync::Arc<RawGeometry>, &Material, &MeshFlags)>();
        for (_, (transform, geometry, material, flags)) in query.iter() {
            if !flags.visible || geometry.is_empty() {
                continue;
            }
            resources.nodes.push(GpuNode {
                mesh: geometry.upload(gpu),
                model: transform.matrix(),
                color: Color::from_array(material.base_color),
                texture: material.texture.filter(|&i| i < resources.textures.len()),
                double_sided: material.double_sided,
            });
        }

        if let Some(path) = &scene.skybox {
            match Panorama::open(path) {
                Ok(panorama) => {
                    let texture = Texture::from_panorama(gpu, &panorama, "Skybox");
                    let bind_group = self.skybox_pass.create_texture_bind_group(gpu, &texture);
                    resources.environment = panorama.mean_radiance;
                    resources.skybox = Some(BoundTexture {
                        texture,
                        bind_group,
                    });
                }
                Err(err) => tracing::warn!("Skybox disabled: {err}"),
            }
        }

        if let Some(path) = &scene.background {
            match Texture::from_file(gpu, path) {
                Ok(texture) => {
                    let bind_group = self.mesh_pass.create_blit_bind_group(gpu, &texture);
                    resources.background = Some(BoundTexture {
                        texture,
                        bind_group,
                    });
                }
                Err(err) => tracing::warn!("Background disabled: {err}"),
            }
        }

        tracing::info!(
            "Uploaded scene '{}': {} meshes, {} textures",
            scene.id,
            resources.nodes.len(),
            resources.textures.len()
        );
        resources
    }

    fn draw_overlay(&mut self, overlay: &Overlay) {
        let s = overlay.scale();
        let draw = &mut self.draw2d;
        let font = self.font.as_ref();
        draw.clear();

        for (_, element) in overlay.elements() {
            if !element.visible || element.opacity <= 0.0 {
                continue;
            }
            let rect = element.rect;
            let fade = element.opacity;
            match element.kind {
                ElementKind::Panel => {
                    draw.rect(rect, Color::PANEL_BG.fade(fade));
                    draw.frame(rect, 1.0, Color::WHITE.fade(0.25 * fade));
                }
                ElementKind::Text => {
                    if let Some(font) = font {
                        let line_height = font.line_height() * s;
                        let mut y = rect.y;
                        for line in font.wrap(&element.text, rect.width, s) {
                            if y + line_height > rect.bottom() {
                                break;
                            }
                            draw.text(font, rect.x, y, s, &line, Color::WHITE.fade(fade));
                            y += line_height;
                        }
                    }
                }
                ElementKind::Button => {
                    draw.rect(rect, Color::rgba(1.0, 1.0, 1.0, 0.08).fade(fade));
                    draw.frame(rect, 2.0 * s, Color::WHITE.fade(fade));
                    if let Some(font) = font {
                        let w = font.measure(&element.text, s);
                        let x = rect.x + (rect.width - w) * 0.5;
                        let y = rect.y + (rect.height - font.size() * s) * 0.5;
                        draw.text(font, x, y, s, &element.text, Color::WHITE.fade(fade));
                    }
                }
            }
        }

        if overlay.loading {
            let size = 10.0 * s;
            let gap = 8.0 * s;
            let total = 3.0 * size + 2.0 * gap;
            let x0 = (overlay.width() - total) * 0.5;
            let y = overlay.height() - 60.0 * s;
            for (i, alpha) in loading_dots(overlay.elapsed).into_iter().enumerate() {
                let x = x0 + i as f32 * (size + gap);
                draw.rect(Rect::new(x, y, size, size), Color::WHITE.fade(alpha));
            }
        }

        if let Some(notice) = &overlay.notice {
            let banner = Rect::new(0.0, 0.0, overlay.width(), 44.0 * s);
            draw.rect(banner, Color::NOTICE_BG);
            if let Some(font) = font {
                let pad = 12.0 * s;
                let line = font.wrap(notice, banner.width - 2.0 * pad, s).join(" ");
                draw.text(font, pad, pad, s, &line, Color::WHITE);
            }
        }

        if let (Some(lines), Some(font)) = (&overlay.debug, font) {
            let line_height = font.line_height() * 0.8;
            let width = lines
                .iter()
                .map(|l| font.measure(l, 0.8))
                .fold(0.0, f32::max)
                + 16.0;
            let panel = Rect::new(8.0, 8.0, width, lines.len() as f32 * line_height + 16.0);
            draw.rect(panel, Color::DEBUG_BG);
            draw.frame(panel, 1.0, Color::DEBUG_BORDER);
            for (i, line) in lines.iter().enumerate() {
                draw.text(
                    font,
                    16.0,
                    16.0 + i as f32 * line_height,
                    0.8,
                    line,
                    Color::WHITE,
                );
            }
        }
    }
}

/// Opacity of the three loading dots, a wave travelling left to right.
pub(crate) fn loading_dots(elapsed: f32) -> [f32; 3] {
    let mut dots = [0.0; 3];
    for (i, dot) in dots.iter_mut().enumerate() {
        let phase = elapsed * 4.0 - i as f32 * 0.8;
        *dot = 0.25 + 0.75 * (0.5 + 0.5 * phase.sin());
    }
    dots
}

fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

impl RenderSurface for WgpuRenderer {
    fn prepare(&mut self, scene: &Scene) -> bool {
        if !self.scenes.contains_key(&scene.id) {
            let resources = self.upload(scene);
            self.scenes.insert(scene.id.clone(), resources);
        }
        true
    }

    fn render(&mut self, scene: &Scene, overlay: &Overlay) {
        self.mesh_pass.ensure_depth_size(&self.gpu);

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost, reconfiguring");
                self.gpu.reconfigure();
                return;
            }
            Err(err) => {
                tracing::warn!("Skipping frame: {err}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.draw_overlay(overlay);

        let aspect = self.gpu.aspect();
        let resources = self.scenes.get(&scene.id);
        let draw_calls: Vec<DrawCall> = resources
            .map(|res| {
                res.nodes
                    .iter()
                    .map(|node| DrawCall {
                        mesh: &node.mesh,
                        model: node.model,
                        color: node.color,
                        texture: node.texture.map(|i| &res.textures[i].bind_group),
                        double_sided: node.double_sided,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let environment = resources.map_or(Vec3::ZERO, |r| r.environment);
        let scene_uniforms = SceneUniforms::new(
            &scene.camera,
            aspect,
            &scene.atmosphere,
            &scene.lights,
            environment,
        );
        self.mesh_pass
            .prepare(&self.gpu, &scene_uniforms, &draw_calls);
        self.skybox_pass.prepare(
            &self.gpu,
            &SkyUniforms::new(&scene.camera, aspect, scene.atmosphere.exposure),
        );

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.atmosphere.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.mesh_pass.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(res) = resources {
                if let Some(sky) = &res.skybox {
                    self.skybox_pass.render(&mut pass, &sky.bind_group);
                }
                if let Some(background) = &res.background {
                    self.mesh_pass.blit(&mut pass, &background.bind_group);
                }
            }
            self.mesh_pass.render(&mut pass, &draw_calls);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw2d.render(&self.gpu, &mut pass);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    fn release(&mut self, id: &SceneId) {
        if self.scenes.remove(id).is_some() {
            tracing::debug!("Dropped GPU resources of scene '{id}'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_dots_stay_visible_and_travel() {
        for t in [0.0, 0.3, 1.7, 12.5] {
            for alpha in loading_dots(t) {
                assert!((0.25..=1.0).contains(&alpha));
            }
        }
        let a = loading_dots(0.4);
        let b = loading_dots(0.6);
        assert_ne!(a, b);
    }

    #[test]
    fn errors_name_the_file() {
        let err = RenderError::Font {
            path: PathBuf::from("fonts/ui.ttf"),
            message: "bad table".into(),
        };
        assert_eq!(err.to_string(), "failed to parse font fonts/ui.ttf: bad table");
    }
}
