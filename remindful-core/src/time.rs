//! Time utilities: local wall-clock input to UTC instants and back.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("invalid timezone: {0}")]
    Timezone(String),
    #[error("invalid local datetime '{input}': {reason}")]
    Datetime { input: String, reason: String },
    #[error("ambiguous or invalid local time (DST?): {0} {1}")]
    Ambiguous(String, String),
}

pub fn parse_timezone(tz: &str) -> Result<Tz, TimeError> {
    tz.parse().map_err(|_| TimeError::Timezone(tz.to_string()))
}

/// Parse a time like "2026-02-20 23:59" in an IANA tz like "America/Chicago",
/// returning UTC.
pub fn parse_local_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>, TimeError> {
    let tz = parse_timezone(tz)?;

    let ndt = NaiveDateTime::parse_from_str(local.trim(), "%Y-%m-%d %H:%M").map_err(|e| {
        TimeError::Datetime {
            input: local.to_string(),
            reason: e.to_string(),
        }
    })?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| TimeError::Ambiguous(local.to_string(), tz.to_string()))?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Render a UTC instant as "YYYY-MM-DD HH:MM ZONE" in the given zone.
pub fn format_local(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chicago_time() {
        // Feb is CST (UTC-6)
        let utc = parse_local_to_utc("2026-02-20 23:59", "America/Chicago").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-21T05:59:00+00:00");
    }

    #[test]
    fn nonexistent_local_time_is_rejected() {
        // Clocks jump 02:00 -> 03:00 on 2026-03-08 in Chicago.
        let err = parse_local_to_utc("2026-03-08 02:30", "America/Chicago").unwrap_err();
        assert!(matches!(err, TimeError::Ambiguous(..)));
    }

    #[test]
    fn bad_inputs_are_reported() {
        assert!(matches!(
            parse_local_to_utc("2026-02-20 23:59", "Mars/Olympus"),
            Err(TimeError::Timezone(_))
        ));
        assert!(matches!(
            parse_local_to_utc("tomorrow", "UTC"),
            Err(TimeError::Datetime { .. })
        ));
    }

    #[test]
    fn format_in_zone() {
        let utc = parse_local_to_utc("2026-07-01 08:15", "Europe/Istanbul").unwrap();
        let tz = parse_timezone("Europe/Istanbul").unwrap();
        assert_eq!(format_local(utc, tz), "2026-07-01 08:15 +03");
    }
}
