use std::time::{Duration, Instant};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

/// Debounce timer for draft autosave.
///
/// Every mutation pushes the deadline out by `delay`; the timer fires once
/// when the deadline passes and then disarms until the next mutation.
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Restarts the countdown from `now`.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per armed countdown, when `now` has reached
    /// the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until the deadline, used as the event loop's poll timeout.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once_after_delay() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::new(Duration::from_secs(2));
        timer.touch(start);

        assert!(!timer.fire_if_due(start + Duration::from_millis(1999)));
        assert!(timer.fire_if_due(start + Duration::from_secs(2)));
        assert!(!timer.fire_if_due(start + Duration::from_secs(3)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_touch_restarts_countdown() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::new(Duration::from_secs(2));
        timer.touch(start);
        timer.touch(start + Duration::from_secs(1));

        assert!(!timer.fire_if_due(start + Duration::from_secs(2)));
        assert!(timer.fire_if_due(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_cancel_disarms() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::default();
        timer.touch(start);
        timer.cancel();
        assert!(!timer.fire_if_due(start + Duration::from_secs(10)));
        assert_eq!(timer.time_until_due(start), None);
    }

    #[test]
    fn test_time_until_due_saturates() {
        let start = Instant::now();
        let mut timer = AutosaveTimer::new(Duration::from_millis(500));
        timer.touch(start);
        assert_eq!(timer.time_until_due(start), Some(Duration::from_millis(500)));
        assert_eq!(
            timer.time_until_due(start + Duration::from_secs(1)),
            Some(Duration::ZERO)
        );
    }
}
