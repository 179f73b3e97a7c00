use crate::assets::FontAtlas;
use crate::gpu::GpuContext;
use crate::ui::{Color, Rect};

/// Vertex for 2D panel/text rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Uniforms for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BatchKind {
    Colored,
    Text,
}

/// A run of consecutive vertices drawn with one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Batch {
    kind: BatchKind,
    start: u32,
    len: u32,
}

/// CPU side of [`Draw2d`]: vertices plus the pipeline runs that preserve
/// submission order, so a panel drawn after some text covers it.
#[derive(Debug, Default)]
pub(crate) struct Batcher {
    vertices: Vec<Vertex2d>,
    batches: Vec<Batch>,
    overflowed: bool,
}

impl Batcher {
    fn clear(&mut self) {
        self.vertices.clear();
        self.batches.clear();
        self.overflowed = false;
    }

    fn push_quad(&mut self, kind: BatchKind, rect: Rect, uv: [f32; 4], color: Color) {
        if self.vertices.len() + 6 > MAX_VERTICES {
            if !self.overflowed {
                tracing::warn!("2D vertex budget of {} exhausted, dropping quads", MAX_VERTICES);
                self.overflowed = true;
            }
            return;
        }

        let c = color.to_array();
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());
        let (u0, v0, u1, v1) = (uv[0], uv[1], uv[0] + uv[2], uv[1] + uv[3]);
        let v = |x, y, u, w| Vertex2d {
            position: [x, y],
            uv: [u, w],
            color: c,
        };
        self.vertices.extend_from_slice(&[
            v(x0, y0, u0, v0),
            v(x1, y0, u1, v0),
            v(x0, y1, u0, v1),
            v(x1, y0, u1, v0),
            v(x1, y1, u1, v1),
            v(x0, y1, u0, v1),
        ]);

        match self.batches.last_mut() {
            Some(batch) if batch.kind == kind => batch.len += 6,
            _ => self.batches.push(Batch {
                kind,
                start: self.vertices.len() as u32 - 6,
                len: 6,
            }),
        }
    }
}

/// Immediate-mode 2D drawing API for overlay panels and text.
///
/// Draw calls are collected during the frame and rendered in one pass, in the
/// order they were issued.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    font_bind_group: Option<wgpu::BindGroup>,

    batcher: Batcher,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uniform bind group layout (group 0)
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Texture bind group layout (group 1)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
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

        let colored_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Colored Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fs: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let colored_pipeline = pipeline(
            "Draw2d Colored Pipeline",
            &colored_pipeline_layout,
            "fs_colored",
        );
        let textured_pipeline = pipeline(
            "Draw2d Textured Pipeline",
            &textured_pipeline_layout,
            "fs_textured",
        );

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_group: None,
            batcher: Batcher::default(),
        }
    }

    /// Bind the atlas that subsequent [`Draw2d::text`] calls sample.
    pub fn set_font(&mut self, gpu: &GpuContext, font: &FontAtlas) {
        self.font_bind_group = Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Font Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&font.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&font.sampler),
                },
            ],
        }));
    }

    /// Clear all draw calls for the new frame.
    pub fn clear(&mut self) {
        self.batcher.clear();
    }

    pub fn rect(&mut self, rect: Rect, color: Color) {
        self.batcher
            .push_quad(BatchKind::Colored, rect, [0.0; 4], color);
    }

    /// Outline of `rect`, `thickness` pixels wide, drawn inside it.
    pub fn frame(&mut self, rect: Rect, thickness: f32, color: Color) {
        let t = thickness.min(rect.width * 0.5).min(rect.height * 0.5);
        self.rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.rect(Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
        self.rect(Rect::new(rect.x, rect.y + t, t, rect.height - 2.0 * t), color);
        self.rect(
            Rect::new(rect.right() - t, rect.y + t, t, rect.height - 2.0 * t),
            color,
        );
    }

    /// Draw one line of text with its top-left corner at (`x`, `y`).
    pub fn text(
        &mut self,
        font: &FontAtlas,
        x: f32,
        y: f32,
        scale: f32,
        text: &str,
        color: Color,
    ) {
        let mut cursor_x = x;
        let baseline_y = y + font.size() * scale;

        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                cursor_x += font.size() * 0.5 * scale;
                continue;
            };

            if glyph.width > 0 && glyph.height > 0 {
                // fontdue's ymin is the distance from the baseline to the
                // bottom of the glyph
                let gh = glyph.height as f32 * scale;
                let rect = Rect::new(
                    cursor_x + glyph.offset_x * scale,
                    baseline_y - glyph.offset_y * scale - gh,
                    glyph.width as f32 * scale,
                    gh,
                );
                self.batcher.push_quad(BatchKind::Text, rect, glyph.uv, color);
            }

            cursor_x += glyph.advance * scale;
        }
    }

    /// Render all batched draw calls.
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        if self.batcher.vertices.is_empty() {
            return;
        }

        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        gpu.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&self.batcher.vertices),
        );

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        for batch in &self.batcher.batches {
            match batch.kind {
                BatchKind::Colored => render_pass.set_pipeline(&self.colored_pipeline),
                BatchKind::Text => {
                    let Some(bind_group) = &self.font_bind_group else {
                        continue;
                    };
                    render_pass.set_pipeline(&self.textured_pipeline);
                    render_pass.set_bind_group(1, bind_group, &[]);
                }
            }
            render_pass.draw(batch.start..batch.start + batch.len, 0..1);
        }
    }
}
