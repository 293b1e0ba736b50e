use std::time::Duration;

use tokio::time::Instant;

use crate::events::Direction;

const CLAIM_DISTANCE_PX: f32 = 10.0;
const MAX_SWIPE_DURATION: Duration = Duration::from_millis(300);
const MIN_SWIPE_DISTANCE_PX: f32 = 75.0;

#[derive(Debug, Clone, Copy)]
struct Start {
    x: f32,
    y: f32,
    at: Instant,
}

/// Classifies a single touch sequence as a horizontal swipe or nothing.
#[derive(Debug, Default)]
pub struct SwipeRecognizer {
    start: Option<Start>,
    horizontal: bool,
}

impl SwipeRecognizer {
    pub fn start(&mut self, x: f32, y: f32, at: Instant) {
        self.start = Some(Start { x, y, at });
        self.horizontal = false;
    }

    /// Returns true once the gesture is claimed as horizontal, after which
    /// the host should stop default scrolling.
    pub fn moved(&mut self, x: f32, y: f32) -> bool {
        let Some(start) = self.start else {
            return false;
        };
        let dx = (x - start.x).abs();
        let dy = (y - start.y).abs();
        if dx > CLAIM_DISTANCE_PX && dx > dy {
            self.horizontal = true;
        }
        self.horizontal
    }

    /// Leftward swipes go forward, rightward swipes go back.
    pub fn end(&mut self, x: f32, y: f32, at: Instant) -> Option<Direction> {
        self.moved(x, y);
        let start = self.start.take()?;
        let horizontal = std::mem::take(&mut self.horizontal);
        let dx = x - start.x;
        let elapsed = at.saturating_duration_since(start.at);
        if !horizontal || elapsed >= MAX_SWIPE_DURATION || dx.abs() <= MIN_SWIPE_DISTANCE_PX {
            return None;
        }
        Some(if dx < 0.0 {
            Direction::Next
        } else {
            Direction::Prev
        })
    }

    pub fn cancel(&mut self) {
        self.start = None;
        self.horizontal = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(dx: f32, dy: f32, millis: u64) -> Option<Direction> {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::default();
        swipe.start(400.0, 300.0, t0);
        swipe.moved(400.0 + dx * 0.5, 300.0 + dy * 0.5);
        swipe.end(400.0 + dx, 300.0 + dy, t0 + Duration::from_millis(millis))
    }

    #[test]
    fn short_swipe_is_ignored() {
        assert_eq!(swipe(-50.0, 0.0, 200), None);
        assert_eq!(swipe(50.0, 0.0, 200), None);
    }

    #[test]
    fn long_fast_swipe_navigates() {
        assert_eq!(swipe(-100.0, 0.0, 200), Some(Direction::Next));
        assert_eq!(swipe(100.0, 0.0, 200), Some(Direction::Prev));
    }

    #[test]
    fn slow_or_vertical_swipes_are_ignored() {
        assert_eq!(swipe(-100.0, 0.0, 300), None);
        assert_eq!(swipe(-100.0, -150.0, 100), None);
    }

    #[test]
    fn claim_requires_more_than_ten_pixels() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::default();
        swipe.start(0.0, 0.0, t0);
        assert!(!swipe.moved(10.0, 0.0));
        assert!(swipe.moved(11.0, 2.0));
        swipe.cancel();
        assert!(swipe.end(200.0, 0.0, t0).is_none());
    }
}
