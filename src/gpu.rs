//! wgpu implementation of the slideshow renderer.

mod overlay;
mod pipeline;
pub mod texture;

use std::sync::Arc;

use tracing::{debug, info, warn};
use wgpu::SurfaceError;
use winit::window::Window;

use crate::config::{FitMode, OverlayConfig};
use crate::error::{RenderError, SliderError};
use crate::layout::{OverlayLayout, compute_uv_scale};
use crate::render::{Caption, FrameBindings, Renderer, SurfaceSize, TransitionUniforms};

use overlay::OverlayRenderer;
use pipeline::{DisplacementPipeline, FitUniforms};
use texture::{GpuTexture, WgpuTextureFactory};

/// Surface, device and queue for one window.
pub struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    pub fn new(window: Arc<Window>) -> Result<Self, SliderError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|err| SliderError::Gpu(format!("failed to create surface: {err}")))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| SliderError::Gpu(format!("failed to acquire GPU adapter: {err}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| SliderError::Gpu("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("hero-slider-device"),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|err| SliderError::Gpu(format!("failed to acquire GPU device: {err}")))?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            adapter = %adapter.get_info().name,
            "surface configured"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn texture_factory(&self) -> WgpuTextureFactory {
        WgpuTextureFactory::new(&self.device, &self.queue)
    }

    fn reconfigure(&mut self, size: SurfaceSize) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
    }
}

struct Bound {
    bindings: FrameBindings<GpuTexture>,
    group: wgpu::BindGroup,
}

struct GpuState {
    ctx: GpuContext,
    pipeline: DisplacementPipeline,
    overlay: OverlayRenderer,
    bound: Option<Bound>,
}

/// Draws the displacement quad and overlay into a window surface.
pub struct WgpuRenderer {
    state: Option<GpuState>,
    size: SurfaceSize,
    fit: FitMode,
}

impl WgpuRenderer {
    pub fn new(ctx: GpuContext, fit: FitMode, overlay: &OverlayConfig) -> Self {
        let size = SurfaceSize::new(ctx.config.width, ctx.config.height);
        let format = ctx.config.format;
        let pipeline = DisplacementPipeline::new(&ctx.device, format);
        let overlay = OverlayRenderer::new(
            &ctx.device,
            &ctx.queue,
            format,
            overlay,
            OverlayLayout::compute(size),
        );
        Self {
            state: Some(GpuState {
                ctx,
                pipeline,
                overlay,
                bound: None,
            }),
            size,
            fit,
        }
    }

    fn write_fit(&self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let Some(bound) = state.bound.as_ref() else {
            return;
        };
        let scale = |texture: &GpuTexture| {
            compute_uv_scale(self.fit, self.size, texture.width, texture.height)
        };
        state.pipeline.write_fit(
            &state.ctx.queue,
            &FitUniforms {
                current_scale: scale(&bound.bindings.current),
                next_scale: scale(&bound.bindings.next),
            },
        );
    }
}

impl Renderer for WgpuRenderer {
    type Texture = GpuTexture;

    fn bind(&mut self, bindings: FrameBindings<GpuTexture>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let group = state.pipeline.bind_group(&state.ctx.device, &bindings);
        state.bound = Some(Bound { bindings, group });
        self.write_fit();
    }

    fn set_caption(&mut self, caption: Caption) {
        if let Some(state) = self.state.as_mut() {
            state.overlay.set_caption(&state.ctx.device, caption);
        }
    }

    fn render(&mut self, uniforms: TransitionUniforms) -> Result<(), RenderError> {
        let size = self.size;
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        if size.is_empty() {
            return Ok(());
        }

        let frame = match state.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                debug!("surface lost; reconfiguring");
                state.ctx.reconfigure(size);
                return Err(RenderError::SurfaceLost);
            }
            Err(SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(SurfaceError::Timeout) => return Err(RenderError::Timeout),
            Err(SurfaceError::Other) => {
                state.ctx.reconfigure(size);
                return Err(RenderError::Other(
                    "surface reported an unknown error".to_string(),
                ));
            }
        };

        let GpuState {
            ctx,
            pipeline,
            overlay,
            bound,
        } = state;
        pipeline.write_transition(&ctx.queue, &uniforms);
        overlay.prepare(&ctx.device, &ctx.queue, 1.0 - uniforms.progress);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("slideshow-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("slideshow-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if let Some(bound) = bound.as_ref() {
                pipeline.draw(&mut pass, &bound.group);
            }
            overlay.draw(&mut pass);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        overlay.after_frame();
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() {
            return;
        }
        self.size = size;
        if let Some(state) = self.state.as_mut() {
            state.ctx.reconfigure(size);
            state
                .overlay
                .resize(&state.ctx.device, OverlayLayout::compute(size));
            debug!(width = size.width, height = size.height, "surface resized");
        }
        self.write_fit();
    }

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn release(&mut self) -> bool {
        let Some(state) = self.state.take() else {
            return false;
        };
        let had_bindings = state.bound.is_some();
        drop(state);
        info!(had_bindings, "GPU resources released");
        true
    }
}

impl Drop for WgpuRenderer {
    fn drop(&mut self) {
        if self.release() {
            warn!("renderer dropped without explicit release");
        }
    }
}
