use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::texture::GpuTexture;
use crate::render::{FrameBindings, TransitionUniforms};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

/// Full-surface quad, drawn as a triangle strip.
const QUAD: [Vertex; 4] = [
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
];

/// Per-texture UV scale; matches `Fit` in `displacement.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FitUniforms {
    pub current_scale: [f32; 2],
    pub next_scale: [f32; 2],
}

impl Default for FitUniforms {
    fn default() -> Self {
        Self {
            current_scale: [1.0, 1.0],
            next_scale: [1.0, 1.0],
        }
    }
}

/// The one program that draws slides: two images blended through a
/// displacement map.
pub struct DisplacementPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    quad: wgpu::Buffer,
    transition: wgpu::Buffer,
    fit: wgpu::Buffer,
}

impl DisplacementPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("displacement-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("displacement.wgsl").into()),
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("displacement-bind-layout"),
            entries: &[
                // current
                texture_entry(0),
                sampler_entry(1),
                // next
                texture_entry(2),
                sampler_entry(3),
                // displacement
                texture_entry(4),
                sampler_entry(5),
                uniform_entry(6),
                uniform_entry(7),
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("displacement-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("displacement-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("displacement-quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let transition = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("displacement-transition"),
            contents: bytemuck::bytes_of(&TransitionUniforms::settled()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let fit = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("displacement-fit"),
            contents: bytemuck::bytes_of(&FitUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            pipeline,
            bind_layout,
            quad,
            transition,
            fit,
        }
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        bindings: &FrameBindings<GpuTexture>,
    ) -> wgpu::BindGroup {
        let (current, next, displacement) = (
            bindings.current.as_ref(),
            bindings.next.as_ref(),
            bindings.displacement.as_ref(),
        );
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("displacement-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&current.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&current.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&next.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&next.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&displacement.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&displacement.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: self.transition.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: self.fit.as_entire_binding(),
                },
            ],
        })
    }

    pub fn write_transition(&self, queue: &wgpu::Queue, uniforms: &TransitionUniforms) {
        queue.write_buffer(&self.transition, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn write_fit(&self, queue: &wgpu::Queue, fit: &FitUniforms) {
        queue.write_buffer(&self.fit, 0, bytemuck::bytes_of(fit));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..4, 0..1);
    }
}
