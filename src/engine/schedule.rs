use std::time::Duration;

use tokio::time::Instant;

use crate::render::SurfaceSize;

/// One pending autoplay deadline at most.
#[derive(Debug)]
pub struct AutoplayScheduler {
    enabled: bool,
    deadline: Option<Instant>,
}

impl AutoplayScheduler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            deadline: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Replace any pending deadline with `now + after`.
    pub fn arm(&mut self, now: Instant, after: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        self.deadline = Some(now + after);
        true
    }

    /// Returns whether a deadline was pending.
    pub fn disarm(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Consume the deadline once it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Collapses bursts of resize events into one surface reconfigure.
#[derive(Debug)]
pub struct ResizeDebounce {
    delay: Duration,
    pending: Option<(Instant, SurfaceSize)>,
}

impl ResizeDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, now: Instant, size: SurfaceSize) {
        self.pending = Some((now + self.delay, size));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(at, _)| at)
    }

    pub fn take_due(&mut self, now: Instant) -> Option<SurfaceSize> {
        match self.pending {
            Some((at, size)) if at <= now => {
                self.pending = None;
                Some(size)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_replaces_and_disarm_is_idempotent() {
        let t0 = Instant::now();
        let mut autoplay = AutoplayScheduler::new(true);
        assert!(autoplay.arm(t0, Duration::from_secs(7)));
        assert!(autoplay.arm(t0, Duration::from_secs(3)));
        assert_eq!(autoplay.deadline(), Some(t0 + Duration::from_secs(3)));
        assert!(autoplay.disarm());
        assert!(!autoplay.disarm());
        assert!(autoplay.deadline().is_none());
    }

    #[test]
    fn fires_once_when_due() {
        let t0 = Instant::now();
        let mut autoplay = AutoplayScheduler::new(true);
        autoplay.arm(t0, Duration::from_millis(7000));
        assert!(!autoplay.fire(t0 + Duration::from_millis(6999)));
        assert!(autoplay.fire(t0 + Duration::from_millis(7000)));
        assert!(!autoplay.fire(t0 + Duration::from_millis(7001)));
    }

    #[test]
    fn disabled_autoplay_never_arms() {
        let mut autoplay = AutoplayScheduler::new(false);
        assert!(!autoplay.arm(Instant::now(), Duration::from_secs(1)));
        assert!(autoplay.deadline().is_none());
    }

    #[test]
    fn debounce_keeps_latest_size() {
        let t0 = Instant::now();
        let mut debounce = ResizeDebounce::new(Duration::from_millis(100));
        debounce.schedule(t0, SurfaceSize::new(800, 600));
        debounce.schedule(t0 + Duration::from_millis(50), SurfaceSize::new(1024, 768));
        assert!(debounce.take_due(t0 + Duration::from_millis(100)).is_none());
        assert_eq!(
            debounce.take_due(t0 + Duration::from_millis(150)),
            Some(SurfaceSize::new(1024, 768))
        );
        assert!(debounce.deadline().is_none());
    }
}
