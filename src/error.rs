use thiserror::Error;

/// Which stage of turning a URL into a texture went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    Fetch,
    Decode,
    Upload,
}

/// A single image or displacement map that could not be made into a texture.
///
/// Cloneable so one failure can be observed by every waiter on a shared load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to {} {url}: {message}", .kind.verb())]
pub struct LoadError {
    pub url: String,
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadErrorKind {
    const fn verb(self) -> &'static str {
        match self {
            LoadErrorKind::Fetch => "fetch",
            LoadErrorKind::Decode => "decode",
            LoadErrorKind::Upload => "upload",
        }
    }
}

impl LoadError {
    pub fn new(url: impl Into<String>, kind: LoadErrorKind, message: impl ToString) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.to_string(),
        }
    }

    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::new(url, LoadErrorKind::Fetch, message)
    }

    pub fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        Self::new(url, LoadErrorKind::Decode, message)
    }

    pub fn upload(url: impl Into<String>, message: impl ToString) -> Self {
        Self::new(url, LoadErrorKind::Upload, message)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("output surface lost")]
    SurfaceLost,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("render failed: {0}")]
    Other(String),
}

impl RenderError {
    /// Whether the engine can keep running after this error.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, RenderError::OutOfMemory)
    }
}

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum SliderError {
    /// The slide list or engine options cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A slide image or the default displacement map failed at init.
    #[error(transparent)]
    ResourceLoad(#[from] LoadError),

    /// A transition was dropped because one of its resources failed.
    #[error("transition {from} -> {to} aborted")]
    TransitionAborted {
        from: usize,
        to: usize,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Adapter, device or surface creation failed.
    #[error("gpu setup failed: {0}")]
    Gpu(String),
}
