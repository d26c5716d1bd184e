use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SubsecRound, Utc};

/// Time source for message and room timestamps. Readings have millisecond
/// precision, matching what the store keeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Starts at a fixed instant and moves forward by `step_millis` on every
/// reading. Makes ordering deterministic in tests and replays.
#[derive(Debug)]
pub struct SteppingClock {
    next_millis: AtomicI64,
    step_millis: i64,
}

impl SteppingClock {
    pub fn new(start_millis: i64, step_millis: i64) -> Self {
        Self {
            next_millis: AtomicI64::new(start_millis),
            step_millis,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::Relaxed);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_clock_advances() {
        let clock = SteppingClock::new(1_000, 5);
        assert_eq!(clock.now().timestamp_millis(), 1_000);
        assert_eq!(clock.now().timestamp_millis(), 1_005);
    }

    #[test]
    fn system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
