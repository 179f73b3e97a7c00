//! Lit 3D mesh pass with depth testing and texture support.
//!
//! The mesh pass uses three bind groups:
//! - **Group 0**: Scene uniforms (view/projection, camera position, ambient
//!   and environment light, fog, exposure, point lights)
//! - **Group 1**: Model uniforms, one slot per draw in a dynamic-offset buffer
//! - **Group 2**: Texture and sampler for the mesh surface
//!
//! Rendering is split in two: [`MeshPass::prepare`] uploads every uniform for
//! the frame before the render pass begins, [`MeshPass::render`] only records
//! draws. Each draw reads its own model slot, so every mesh keeps its own
//! transform.
//!
//! # Blitting
//!
//! [`MeshPass::blit`] draws a texture over the whole target. The renderer uses
//! it for the still background image behind the start scene.

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use crate::scene::{Atmosphere, PointLight};
use crate::texture::Texture;
use crate::ui::Color;

/// Point lights the shader evaluates. Extra lights are ignored.
pub const MAX_LIGHTS: usize = 4;

/// Model slots are spaced to the device's uniform offset alignment.
const MODEL_ALIGNMENT: u64 = 256;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// xyz position, w range.
    pub position_range: [f32; 4],
    /// rgb color, a intensity.
    pub color_intensity: [f32; 4],
}

/// Per-frame uniforms shared by every mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub exposure: f32,
    /// rgb ambient color, a environment intensity.
    pub ambient: [f32; 4],
    /// Mean radiance of the skybox panorama.
    pub environment: [f32; 4],
    /// rgb fog color, a exponential-squared density.
    pub fog: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
    pub light_count: u32,
    pub _padding: [u32; 3],
}

impl SceneUniforms {
    pub fn new(
        camera: &Camera,
        aspect: f32,
        atmosphere: &Atmosphere,
        lights: &[PointLight],
        environment: Vec3,
    ) -> Self {
        let mut packed = [LightUniform::default(); MAX_LIGHTS];
        let count = lights.len().min(MAX_LIGHTS);
        for (slot, light) in packed.iter_mut().zip(lights) {
            *slot = LightUniform {
                position_range: light.position.extend(light.range).to_array(),
                color_intensity: light.color.extend(light.intensity).to_array(),
            };
        }

        Self {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            exposure: atmosphere.exposure,
            ambient: atmosphere
                .ambient_color
                .extend(atmosphere.environment_intensity)
                .to_array(),
            environment: environment.extend(1.0).to_array(),
            fog: atmosphere
                .fog_color
                .extend(atmosphere.fog_density)
                .to_array(),
            lights: packed,
            light_count: count as u32,
            _padding: [0; 3],
        }
    }
}

/// Per-draw model uniforms.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    /// Base color multiplied with the texture.
    pub color: [f32; 4],
}

impl ModelUniforms {
    pub fn new(model: Mat4, color: Color) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

/// A mesh queued for rendering.
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub model: Mat4,
    pub color: Color,
    /// Bind group from [`MeshPass::create_texture_bind_group`]; white when `None`.
    pub texture: Option<&'a wgpu::BindGroup>,
    /// Disable back-face culling.
    pub double_sided: bool,
}

/// Handles lit 3D mesh rendering with depth testing.
///
/// Back faces are culled (counter-clockwise front faces) unless a draw is
/// double sided. Depth uses a 32-bit float buffer with `Less` comparison.
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    double_sided_pipeline: wgpu::RenderPipeline,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group_layout: wgpu::BindGroupLayout,
    model_bind_group: wgpu::BindGroup,
    model_capacity: usize,
    #[allow(dead_code)]
    depth_texture: wgpu::Texture,
    pub(crate) depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    default_texture_bind_group: wgpu::BindGroup,
}

impl MeshPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // Scene uniform buffer (group 0)
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        // Model uniform buffer (group 1), one aligned slot per draw
        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ModelUniforms>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::create_model_buffer(gpu, &model_bind_group_layout, model_capacity);

        // Texture bind group layout (group 2)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let default_texture = Texture::white(gpu);
        let default_texture_bind_group = Self::texture_bind_group(
            gpu,
            &texture_bind_group_layout,
            &default_texture,
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &scene_bind_group_layout,
                &model_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let (depth_texture, depth_view) = Self::create_depth_texture(gpu);

        // Blit pipeline for the background layer
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Blit Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_bind_group_layout],
            push_constant_ranges: &[],
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mesh_pipeline = |label: &str, cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode,
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline = mesh_pipeline("Mesh Pipeline", Some(wgpu::Face::Back));
        let double_sided_pipeline = mesh_pipeline("Double-Sided Mesh Pipeline", None);

        Self {
            pipeline,
            double_sided_pipeline,
            scene_buffer,
            scene_bind_group,
            model_buffer,
            model_bind_group_layout,
            model_bind_group,
            model_capacity,
            depth_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
            blit_pipeline,
            blit_bind_group_layout,
            blit_sampler,
            texture_bind_group_layout,
            default_texture_bind_group,
        }
    }

    fn create_model_buffer(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: capacity as u64 * MODEL_ALIGNMENT,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn texture_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Bind group for a material texture. Create once and cache it.
    pub fn create_texture_bind_group(
        &self,
        gpu: &GpuContext,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        Self::texture_bind_group(gpu, &self.texture_bind_group_layout, texture)
    }

    /// Bind group for a full-screen [`MeshPass::blit`] source.
    pub fn create_blit_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &self.blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                },
            ],
        })
    }

    fn create_depth_texture(gpu: &GpuContext) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreate the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            let (texture, view) = Self::create_depth_texture(gpu);
            self.depth_texture = texture;
            self.depth_view = view;
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Draw `bind_group`'s texture over the whole target.
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass, bind_group: &wgpu::BindGroup) {
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    /// Upload the frame's scene uniforms and one model slot per draw call.
    ///
    /// Must run before the render pass that calls [`MeshPass::render`].
    pub fn prepare(&mut self, gpu: &GpuContext, scene: &SceneUniforms, draw_calls: &[DrawCall]) {
        gpu.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[*scene]));

        if draw_calls.len() > self.model_capacity {
            self.model_capacity = draw_calls.len().next_power_of_two();
            let (buffer, bind_group) = Self::create_model_buffer(
                gpu,
                &self.model_bind_group_layout,
                self.model_capacity,
            );
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            tracing::debug!("Model uniform buffer grown to {} slots", self.model_capacity);
        }

        let mut staging = vec![0u8; draw_calls.len() * MODEL_ALIGNMENT as usize];
        for (i, call) in draw_calls.iter().enumerate() {
            let uniforms = ModelUniforms::new(call.model, call.color);
            let offset = i * MODEL_ALIGNMENT as usize;
            let bytes = bytemuck::bytes_of(&uniforms);
            staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            gpu.queue.write_buffer(&self.model_buffer, 0, &staging);
        }
    }

    /// Record the draws uploaded by the last [`MeshPass::prepare`].
    pub fn render(&self, render_pass: &mut wgpu::RenderPass, draw_calls: &[DrawCall]) {
        if draw_calls.is_empty() {
            return;
        }

        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

        let mut double_sided = None;
        for (i, call) in draw_calls.iter().enumerate() {
            if double_sided != Some(call.double_sided) {
                render_pass.set_pipeline(if call.double_sided {
                    &self.double_sided_pipeline
                } else {
                    &self.pipeline
                });
                double_sided = Some(call.double_sided);
            }

            let offset = (i as u64 * MODEL_ALIGNMENT) as u32;
            render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);
            render_pass.set_bind_group(
                2,
                call.texture.unwrap_or(&self.default_texture_bind_group),
                &[],
            );

            render_pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_slot_fits_alignment() {
        assert!(std::mem::size_of::<ModelUniforms>() as u64 <= MODEL_ALIGNMENT);
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
    }

    #[test]
    fn scene_uniforms_cap_light_count() {
        let light = PointLight {
            name: "l".into(),
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec3::ONE,
            intensity: 2.0,
            range: 10.0,
            follow_camera: false,
        };
        let lights = vec![light; MAX_LIGHTS + 2];
        let uniforms = SceneUniforms::new(
            &Camera::new(),
            16.0 / 9.0,
            &Atmosphere::default(),
            &lights,
            Vec3::ZERO,
        );
        assert_eq!(uniforms.light_count, MAX_LIGHTS as u32);
        assert_eq!(uniforms.lights[0].position_range, [1.0, 2.0, 3.0, 10.0]);
        assert_eq!(uniforms.lights[0].color_intensity[3], 2.0);
    }

    #[test]
    fn atmosphere_is_packed() {
        let atmosphere = Atmosphere {
            ambient_color: Vec3::splat(0.2),
            environment_intensity: 0.5,
            fog_color: Vec3::new(0.1, 0.2, 0.3),
            fog_density: 0.01,
            exposure: 1.4,
            ..Atmosphere::default()
        };
        let uniforms =
            SceneUniforms::new(&Camera::new(), 1.0, &atmosphere, &[], Vec3::splat(0.7));
        assert_eq!(uniforms.ambient, [0.2, 0.2, 0.2, 0.5]);
        assert_eq!(uniforms.fog, [0.1, 0.2, 0.3, 0.01]);
        assert_eq!(uniforms.environment, [0.7, 0.7, 0.7, 1.0]);
        assert_eq!(uniforms.exposure, 1.4);
        assert_eq!(uniforms.light_count, 0);
    }
}
