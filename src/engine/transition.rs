use std::time::Duration;

use tokio::time::Instant;

use crate::events::{Direction, Trigger};

/// Cubic ease-in-out over `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A transition the controller has accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
    pub trigger: Trigger,
    pub generation: u64,
}

/// Snapshot of the transition in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionState {
    pub from: usize,
    pub to: usize,
    pub progress: f32,
    pub direction: Direction,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub progress: f32,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// Waiting for displacement maps.
    Preparing(Ticket),
    Animating {
        ticket: Ticket,
        started_at: Instant,
        duration: Duration,
        progress: f32,
    },
}

pub struct TransitionController {
    phase: Phase,
    current: usize,
    generation: u64,
}

impl TransitionController {
    pub fn new(current: usize) -> Self {
        Self {
            phase: Phase::Idle,
            current,
            generation: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase, Phase::Animating { .. })
    }

    pub fn state(&self) -> Option<TransitionState> {
        let (ticket, progress) = match self.phase {
            Phase::Idle => return None,
            Phase::Preparing(ticket) => (ticket, 0.0),
            Phase::Animating {
                ticket, progress, ..
            } => (ticket, progress),
        };
        Some(TransitionState {
            from: ticket.from,
            to: ticket.to,
            progress,
            direction: ticket.direction,
            active: true,
        })
    }

    /// Accept a move only when idle and there is somewhere to go.
    pub fn request(
        &mut self,
        direction: Direction,
        trigger: Trigger,
        count: usize,
    ) -> Option<Ticket> {
        if !self.is_idle() || count < 2 {
            return None;
        }
        self.generation += 1;
        let ticket = Ticket {
            from: self.current,
            to: direction.step(self.current, count),
            direction,
            trigger,
            generation: self.generation,
        };
        self.phase = Phase::Preparing(ticket);
        Some(ticket)
    }

    /// The preparing ticket, if `generation` is still the live one.
    pub fn preparing(&self, generation: u64) -> Option<Ticket> {
        match self.phase {
            Phase::Preparing(ticket) if ticket.generation == generation => Some(ticket),
            _ => None,
        }
    }

    pub fn begin_animation(&mut self, generation: u64, now: Instant, duration: Duration) -> bool {
        let Some(ticket) = self.preparing(generation) else {
            return false;
        };
        self.phase = Phase::Animating {
            ticket,
            started_at: now,
            duration,
            progress: 0.0,
        };
        true
    }

    /// Eased progress at `now`; never moves backwards within one transition.
    pub fn tick(&mut self, now: Instant) -> Option<Tick> {
        let Phase::Animating {
            started_at,
            duration,
            progress,
            ..
        } = &mut self.phase
        else {
            return None;
        };
        let elapsed = now.saturating_duration_since(*started_at);
        let finished = duration.is_zero() || elapsed >= *duration;
        let linear = if finished {
            1.0
        } else {
            elapsed.as_secs_f32() / duration.as_secs_f32()
        };
        *progress = ease_in_out_cubic(linear).max(*progress);
        Some(Tick {
            progress: *progress,
            finished,
        })
    }

    /// Commit the target index and return to idle.
    pub fn complete(&mut self) -> Option<Ticket> {
        let Phase::Animating { ticket, .. } = self.phase else {
            return None;
        };
        self.current = ticket.to;
        self.phase = Phase::Idle;
        Some(ticket)
    }

    /// Drop the transition for `generation` without moving.
    pub fn abort(&mut self, generation: u64) -> Option<Ticket> {
        let ticket = self.preparing(generation)?;
        self.phase = Phase::Idle;
        Some(ticket)
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints_and_symmetry() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.25) + ease_in_out_cubic(0.75) - 1.0).abs() < 1e-6);
        assert_eq!(ease_in_out_cubic(-3.0), 0.0);
        assert_eq!(ease_in_out_cubic(7.0), 1.0);
    }

    #[test]
    fn wraps_in_both_directions() {
        let mut sm = TransitionController::new(4);
        let next = sm.request(Direction::Next, Trigger::Manual, 5).unwrap();
        assert_eq!((next.from, next.to), (4, 0));
        sm.abort(next.generation);

        let mut sm = TransitionController::new(0);
        let prev = sm.request(Direction::Prev, Trigger::Manual, 5).unwrap();
        assert_eq!((prev.from, prev.to), (0, 4));
    }

    #[test]
    fn single_slide_requests_are_noops() {
        let mut sm = TransitionController::new(0);
        assert!(sm.request(Direction::Next, Trigger::Manual, 1).is_none());
        assert!(sm.request(Direction::Prev, Trigger::Autoplay, 1).is_none());
        assert!(sm.is_idle());
        assert_eq!(sm.current_index(), 0);
    }

    #[test]
    fn second_request_is_absorbed_until_complete() {
        let t0 = Instant::now();
        let mut sm = TransitionController::new(0);
        let ticket = sm.request(Direction::Next, Trigger::Manual, 3).unwrap();
        assert!(sm.request(Direction::Next, Trigger::Manual, 3).is_none());
        assert!(sm.begin_animation(ticket.generation, t0, Duration::from_secs(2)));
        assert!(sm.request(Direction::Prev, Trigger::Manual, 3).is_none());

        let mid = sm.tick(t0 + Duration::from_secs(1)).unwrap();
        assert!(!mid.finished);
        assert_eq!(sm.current_index(), 0, "index moves only on completion");
        let end = sm.tick(t0 + Duration::from_secs(2)).unwrap();
        assert!(end.finished);
        assert_eq!(end.progress, 1.0);

        assert_eq!(sm.complete().unwrap().to, 1);
        assert_eq!(sm.current_index(), 1);
        assert!(sm.request(Direction::Next, Trigger::Autoplay, 3).is_some());
    }

    #[test]
    fn stale_generation_cannot_start_or_abort() {
        let t0 = Instant::now();
        let mut sm = TransitionController::new(0);
        let first = sm.request(Direction::Next, Trigger::Manual, 3).unwrap();
        sm.abort(first.generation).unwrap();
        let second = sm.request(Direction::Next, Trigger::Manual, 3).unwrap();
        assert_ne!(first.generation, second.generation);

        assert!(!sm.begin_animation(first.generation, t0, Duration::from_secs(1)));
        assert!(sm.abort(first.generation).is_none());
        assert_eq!(sm.state().unwrap().progress, 0.0);
        assert!(sm.begin_animation(second.generation, t0, Duration::from_secs(1)));
    }

    #[test]
    fn progress_never_decreases() {
        let t0 = Instant::now();
        let mut sm = TransitionController::new(0);
        let ticket = sm.request(Direction::Next, Trigger::Manual, 2).unwrap();
        sm.begin_animation(ticket.generation, t0, Duration::from_millis(100));
        let later = sm.tick(t0 + Duration::from_millis(60)).unwrap().progress;
        let earlier = sm.tick(t0 + Duration::from_millis(30)).unwrap().progress;
        assert!(earlier >= later);
    }
}
