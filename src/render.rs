use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Shader uniform block; field order matches `displacement.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransitionUniforms {
    pub progress: f32,
    pub intensity: f32,
    pub direction: f32,
    pub _pad: f32,
}

impl TransitionUniforms {
    pub const fn new(progress: f32, intensity: f32, direction: f32) -> Self {
        Self {
            progress,
            intensity,
            direction,
            _pad: 0.0,
        }
    }

    /// Static frame showing only the current texture.
    pub const fn settled() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Textures sampled by the next frames.
pub struct FrameBindings<T> {
    pub current: Arc<T>,
    pub next: Arc<T>,
    pub displacement: Arc<T>,
}

impl<T> Clone for FrameBindings<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            next: self.next.clone(),
            displacement: self.displacement.clone(),
        }
    }
}

/// Text drawn over the settled slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caption {
    pub title: String,
    pub description: String,
    pub call_to_action: Option<String>,
}

/// Output side of the slideshow engine.
///
/// The engine calls `render` once per animation tick while a transition
/// runs and once per state change otherwise.
pub trait Renderer {
    type Texture: Send + Sync + 'static;

    fn bind(&mut self, bindings: FrameBindings<Self::Texture>);

    fn set_caption(&mut self, caption: Caption);

    fn render(&mut self, uniforms: TransitionUniforms) -> Result<(), RenderError>;

    fn resize(&mut self, size: SurfaceSize);

    fn surface_size(&self) -> SurfaceSize;

    /// Release every GPU resource. Returns `false` if already released.
    fn release(&mut self) -> bool;
}
