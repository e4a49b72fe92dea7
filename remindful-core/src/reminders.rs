//! Reminder model + next-trigger arithmetic.
//!
//! Reminders operate on absolute instants. Repeating reminders advance by a
//! fixed number of milliseconds per firing, so DST shifts and month lengths
//! never move them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: i64 = 86_400_000;
pub const MS_PER_WEEK: i64 = 604_800_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
    #[default]
    Once,
    Daily,
    Weekly,
}

impl RepeatInterval {
    /// Step between two firings, `None` for one-shot reminders.
    pub fn step(&self) -> Option<Duration> {
        match self {
            RepeatInterval::Once => None,
            RepeatInterval::Daily => Some(Duration::milliseconds(MS_PER_DAY)),
            RepeatInterval::Weekly => Some(Duration::milliseconds(MS_PER_WEEK)),
        }
    }
}

impl fmt::Display for RepeatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepeatInterval::Once => "once",
            RepeatInterval::Daily => "daily",
            RepeatInterval::Weekly => "weekly",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown repeat interval '{0}' (expected once, daily or weekly)")]
pub struct ParseRepeatError(String);

impl FromStr for RepeatInterval {
    type Err = ParseRepeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(RepeatInterval::Once),
            "daily" => Ok(RepeatInterval::Daily),
            "weekly" => Ok(RepeatInterval::Weekly),
            other => Err(ParseRepeatError(other.to_string())),
        }
    }
}

/// Scheduling metadata embedded in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Instant originally requested by the user.
    pub trigger_at: DateTime<Utc>,
    pub repeat: RepeatInterval,
    /// Whether this reminder has (or should have) an armed timer.
    pub enabled: bool,
    /// Instant of the next firing. Advances by one step per repeating firing.
    pub next_trigger: DateTime<Utc>,
}

impl Reminder {
    /// A fresh, enabled reminder whose first firing is `trigger_at`.
    pub fn new(trigger_at: DateTime<Utc>, repeat: RepeatInterval) -> Self {
        Self {
            trigger_at,
            repeat,
            enabled: true,
            next_trigger: trigger_at,
        }
    }

    pub fn disabled(&self) -> Self {
        Self {
            enabled: false,
            ..self.clone()
        }
    }

    /// Same reminder, advanced to its next occurrence. `None` for one-shots.
    pub fn advanced(&self) -> Option<Self> {
        let next_trigger = compute_next_trigger(self.next_trigger, self.repeat)?;
        Some(Self {
            next_trigger,
            ..self.clone()
        })
    }
}

/// Reminder as requested on task creation, before it is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub trigger_at: DateTime<Utc>,
    #[serde(default)]
    pub repeat: RepeatInterval,
}

impl From<NewReminder> for Reminder {
    fn from(r: NewReminder) -> Self {
        Reminder::new(r.trigger_at, r.repeat)
    }
}

/// Next trigger instant after `current` for the given interval.
///
/// `Once` yields `None`, as does an addition that would leave chrono's
/// representable range.
pub fn compute_next_trigger(
    current: DateTime<Utc>,
    repeat: RepeatInterval,
) -> Option<DateTime<Utc>> {
    current.checked_add_signed(repeat.step()?)
}
