//! Interval gates for polled work.
//!
//! Components are called every loop iteration; each owns a [`Schedule`]
//! and only does its work when `due(now)` holds. Time is passed in so tests
//! can drive it with synthetic instants.

use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Schedule {
    interval: Duration,
    last: Option<Instant>,
}

impl Schedule {
    /// A schedule that is due immediately, then every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn due(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// `due` + `mark` in one step. Returns whether the work should run.
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.due(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }

    /// Forget the last run so the next check is due at once.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_check_is_due() {
        let s = Schedule::new(Duration::from_secs(5));
        assert!(s.due(Instant::now()));
    }

    #[test]
    fn fires_once_per_interval() {
        let t0 = Instant::now();
        let mut s = Schedule::new(Duration::from_millis(1500));
        assert!(s.fire(t0));
        assert!(!s.fire(t0 + Duration::from_millis(1499)));
        assert!(s.fire(t0 + Duration::from_millis(1500)));
        assert!(!s.fire(t0 + Duration::from_millis(2000)));
        assert!(s.fire(t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut s = Schedule::new(Duration::from_secs(1));
        s.mark(t0);
        assert!(!s.due(t0 - Duration::from_secs(3)));
    }

    #[test]
    fn reset_makes_due() {
        let t0 = Instant::now();
        let mut s = Schedule::new(Duration::from_secs(10));
        s.mark(t0);
        assert!(!s.due(t0));
        s.reset();
        assert!(s.due(t0));
    }
}
