use crate::render::SurfaceSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    /// Sign fed to the shader's `direction` uniform.
    pub const fn sign(self) -> f32 {
        match self {
            Direction::Next => 1.0,
            Direction::Prev => -1.0,
        }
    }

    /// Target index for a move from `from` over `count` slides.
    pub const fn step(self, from: usize, count: usize) -> usize {
        match self {
            Direction::Next => (from + 1) % count,
            Direction::Prev => (from + count - 1) % count,
        }
    }
}

/// What asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Autoplay,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// Host -> engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SliderInput {
    Navigate(Direction),
    /// Pointer press in surface pixels.
    Click { x: f32, y: f32 },
    Touch { phase: TouchPhase, x: f32, y: f32 },
    Resize(SurfaceSize),
    Visibility(bool),
    Unmount,
}

/// Engine -> host notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SliderEvent {
    Ready {
        slides: usize,
    },
    TransitionStarted {
        from: usize,
        to: usize,
        direction: Direction,
        trigger: Trigger,
    },
    SlideChanged {
        index: usize,
    },
    TransitionAborted {
        from: usize,
        to: usize,
        reason: String,
    },
    /// The call-to-action button of slide `index` was activated.
    CallToAction {
        index: usize,
        link: String,
    },
    Disposed,
}
