use bytemuck::{Pod, Zeroable};
use lyon::math::{Box2D, point};
use lyon::path::builder::BorderRadii;
use lyon::path::{Path, Winding};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, TessellationError, VertexBuffers,
};
use tracing::warn;
use wgpu::util::DeviceExt;

use crate::layout::{OverlayLayout, Rect};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(super) struct ControlVertex {
    position: [f32; 2],
    color: [f32; 4],
    /// 1.0 for shapes that fade with the caption.
    fade: f32,
}

impl ControlVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x4,
        2 => Float32,
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ControlVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ControlsUniform {
    fade_alpha: f32,
    _pad: [f32; 3],
}

/// Linear RGBA colours for the vector parts of the overlay.
#[derive(Debug, Clone, Copy)]
pub struct ControlsStyle {
    pub button_fill: [f32; 4],
    pub chevron: [f32; 4],
    pub call_to_action: [f32; 4],
    pub show_controls: bool,
}

/// Prev/next buttons and the call-to-action pill, tessellated with lyon.
pub struct ControlsRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl ControlsRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay-controls-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("controls.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay-controls-bgl"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay-controls-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay-controls-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[ControlVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay-controls-uniform"),
            contents: bytemuck::bytes_of(&ControlsUniform {
                fade_alpha: 1.0,
                _pad: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay-controls-bind-group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            vertex_buffer: None,
            index_buffer: None,
            index_count: 0,
        }
    }

    /// Rebuild geometry for a new layout or call-to-action visibility.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        layout: &OverlayLayout,
        style: &ControlsStyle,
        call_to_action: bool,
    ) {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.index_count = 0;

        let geometry = match build_geometry(layout, style, call_to_action) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!(error = ?err, "overlay controls tessellation failed");
                return;
            }
        };
        if geometry.vertices.is_empty() || geometry.indices.is_empty() {
            return;
        }

        self.vertex_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay-controls-vertices"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.index_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay-controls-indices"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
        self.index_count = geometry.indices.len() as u32;
    }

    pub fn set_fade(&self, queue: &wgpu::Queue, alpha: f32) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&ControlsUniform {
                fade_alpha: alpha.clamp(0.0, 1.0),
                _pad: [0.0; 3],
            }),
        );
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        if let (Some(vertex_buffer), Some(index_buffer)) = (&self.vertex_buffer, &self.index_buffer)
        {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..self.index_count, 0, 0..1);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Chevron {
    Left,
    Right,
}

/// Tessellate every visible control in pixel space, then map to NDC.
pub(super) fn build_geometry(
    layout: &OverlayLayout,
    style: &ControlsStyle,
    call_to_action: bool,
) -> Result<VertexBuffers<ControlVertex, u16>, TessellationError> {
    let mut buffers: VertexBuffers<ControlVertex, u16> = VertexBuffers::new();
    let width = layout.size.width as f32;
    let height = layout.size.height as f32;
    if width <= 0.0 || height <= 0.0 {
        return Ok(buffers);
    }

    let mut tessellator = FillTessellator::new();
    let mut fill = |path: &Path, color: [f32; 4], fade: f32| {
        tessellator.tessellate_path(
            path,
            &FillOptions::tolerance(0.25),
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| ControlVertex {
                position: vertex.position().to_array(),
                color,
                fade,
            }),
        )
    };

    if style.show_controls {
        for (rect, chevron) in [(&layout.prev, Chevron::Left), (&layout.next, Chevron::Right)] {
            fill(&circle_path(rect), style.button_fill, 0.0)?;
            fill(&chevron_path(rect, chevron), style.chevron, 0.0)?;
        }
    }
    if call_to_action {
        fill(&pill_path(&layout.call_to_action), style.call_to_action, 1.0)?;
    }

    for vertex in &mut buffers.vertices {
        let [x, y] = vertex.position;
        vertex.position = [(x / width) * 2.0 - 1.0, 1.0 - (y / height) * 2.0];
    }
    Ok(buffers)
}

fn circle_path(rect: &Rect) -> Path {
    let (cx, cy) = rect.center();
    let mut builder = Path::builder();
    builder.add_circle(
        point(cx, cy),
        rect.width.min(rect.height) * 0.5,
        Winding::Positive,
    );
    builder.build()
}

fn chevron_path(rect: &Rect, chevron: Chevron) -> Path {
    let (cx, cy) = rect.center();
    let reach = rect.width.min(rect.height) * 0.2;
    let stroke = reach * 0.45;
    // Drawn pointing right, mirrored for the left button.
    let sign = match chevron {
        Chevron::Left => -1.0,
        Chevron::Right => 1.0,
    };
    let x = |dx: f32| cx + dx * sign;

    let mut builder = Path::builder();
    builder.begin(point(x(-reach * 0.5), cy - reach));
    builder.line_to(point(x(-reach * 0.5 + stroke), cy - reach));
    builder.line_to(point(x(reach * 0.5 + stroke), cy));
    builder.line_to(point(x(-reach * 0.5 + stroke), cy + reach));
    builder.line_to(point(x(-reach * 0.5), cy + reach));
    builder.line_to(point(x(reach * 0.5), cy));
    builder.end(true);
    builder.build()
}

fn pill_path(rect: &Rect) -> Path {
    let bounds = Box2D::new(
        point(rect.x, rect.y),
        point(rect.x + rect.width, rect.y + rect.height),
    );
    let mut builder = Path::builder();
    builder.add_rounded_rectangle(
        &bounds,
        &BorderRadii::new(rect.height.min(rect.width) * 0.5),
        Winding::Positive,
    );
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SurfaceSize;

    fn style(show_controls: bool) -> ControlsStyle {
        ControlsStyle {
            button_fill: [0.0, 0.0, 0.0, 0.5],
            chevron: [1.0; 4],
            call_to_action: [0.9, 0.5, 0.1, 1.0],
            show_controls,
        }
    }

    #[test]
    fn geometry_stays_inside_clip_space() {
        let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
        let geometry = build_geometry(&layout, &style(true), true).unwrap();
        assert!(!geometry.indices.is_empty());
        for vertex in &geometry.vertices {
            let [x, y] = vertex.position;
            assert!((-1.0..=1.0).contains(&x), "x out of range: {x}");
            assert!((-1.0..=1.0).contains(&y), "y out of range: {y}");
        }
        assert!(
            geometry
                .indices
                .iter()
                .all(|&idx| (idx as usize) < geometry.vertices.len())
        );
    }

    #[test]
    fn only_the_call_to_action_fades() {
        let layout = OverlayLayout::compute(SurfaceSize::new(1280, 720));
        let without = build_geometry(&layout, &style(true), false).unwrap();
        assert!(without.vertices.iter().all(|v| v.fade == 0.0));

        let with = build_geometry(&layout, &style(true), true).unwrap();
        assert!(with.vertices.len() > without.vertices.len());
        assert!(with.vertices.iter().any(|v| v.fade == 1.0));
    }

    #[test]
    fn hidden_controls_and_no_cta_draw_nothing() {
        let layout = OverlayLayout::compute(SurfaceSize::new(800, 600));
        let geometry = build_geometry(&layout, &style(false), false).unwrap();
        assert!(geometry.vertices.is_empty());
        assert!(geometry.indices.is_empty());
    }
}
