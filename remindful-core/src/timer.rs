//! Timer port: the primitive the scheduler arms jobs with.
//!
//! The scheduler never talks to a concrete timer library. Production wires a
//! tokio-backed implementation; tests use [`crate::testing::FakeTimer`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// Callback run when a job fires. Store failures during trigger handling
/// surface here, in the timer's context.
pub type TimerCallback = Arc<dyn Fn() -> Result<(), StoreError> + Send + Sync>;

/// When a job should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleDescriptor {
    fire_at: DateTime<Utc>,
}

impl ScheduleDescriptor {
    /// One-shot firing at an absolute instant.
    pub fn at(fire_at: DateTime<Utc>) -> Self {
        Self { fire_at }
    }

    pub fn fire_at(&self) -> DateTime<Utc> {
        self.fire_at
    }
}

impl fmt::Display for ScheduleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.fire_at.to_rfc3339())
    }
}

/// Handle to an armed job.
pub trait TimerHandle: Send {
    /// Deactivate the job. After `stop` returns the callback must not run.
    /// Calling it again is a no-op.
    fn stop(&self);
}

pub trait Timer: Send + Sync {
    fn schedule(&self, descriptor: ScheduleDescriptor, callback: TimerCallback)
    -> Box<dyn TimerHandle>;
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn schedule(
        &self,
        descriptor: ScheduleDescriptor,
        callback: TimerCallback,
    ) -> Box<dyn TimerHandle> {
        (**self).schedule(descriptor, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_is_rfc3339() {
        let d = ScheduleDescriptor::at(Utc.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(d.to_string(), "at 2026-12-31T23:00:00+00:00");
    }
}
