//! Single-slot debouncer
//!
//! Holds at most one pending value. Scheduling a new value replaces the
//! pending one and restarts the window, so only the latest value within a
//! quiet period is ever released.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending value and return the new deadline
    pub fn schedule(&mut self, value: T, now: Instant) -> Instant {
        let deadline = now + self.window;
        self.pending = Some((value, deadline));
        deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending value once its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Release the pending value regardless of its deadline
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value without releasing it
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_value_wins() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        debouncer.schedule(true, start);
        debouncer.schedule(false, start + Duration::from_millis(100));
        let deadline = debouncer.schedule(true, start + Duration::from_millis(200));

        assert_eq!(deadline, start + Duration::from_millis(500));
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(debouncer.poll(deadline), Some(true));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(deadline), None);
    }

    #[test]
    fn test_cancel_and_flush() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let now = Instant::now();

        debouncer.schedule(1, now);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        debouncer.schedule(2, now);
        assert_eq!(debouncer.flush(), Some(2));
        assert_eq!(debouncer.deadline(), None);
    }
}
