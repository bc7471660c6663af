use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{LtvError, Result};

// ── Epoch-millisecond parsing ─────────────────────────────────────────────────

/// Convert Unix epoch milliseconds into a UTC [`DateTime`].
///
/// Fails with [`LtvError::TimestampParse`] when the value is outside the
/// range chrono can represent.
pub fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| LtvError::TimestampParse(format!("{millis} ms is out of range")))
}

/// Parse an export cell holding epoch milliseconds.
///
/// * empty / whitespace → `Ok(None)`
/// * integer text (`"1612345678000"`) → timestamp
/// * float text (`"1612345678000.0"`, written by exporters once a column
///   contains gaps) → timestamp, rounded to the nearest millisecond
/// * anything else → [`LtvError::TimestampParse`]
pub fn parse_epoch_millis(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(millis) = trimmed.parse::<i64>() {
        return timestamp_from_millis(millis).map(Some);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => timestamp_from_millis(value.round() as i64).map(Some),
        _ => Err(LtvError::TimestampParse(trimmed.to_string())),
    }
}

// ── Timezones ─────────────────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a configured timezone name.
///
/// `"auto"` resolves to the system timezone. An unrecognised name falls back
/// to UTC and logs a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = if name == "auto" {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("Unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// Render a UTC timestamp in `tz` as `YYYY-MM-DD HH:MM:SS TZ`.
pub fn format_in_timezone(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_from_millis() {
        let dt = timestamp_from_millis(1_609_459_200_000).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_from_millis_out_of_range() {
        assert!(matches!(
            timestamp_from_millis(i64::MAX),
            Err(LtvError::TimestampParse(_))
        ));
    }

    #[test]
    fn test_parse_epoch_millis_empty_is_none() {
        assert_eq!(parse_epoch_millis("").unwrap(), None);
        assert_eq!(parse_epoch_millis("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_epoch_millis_integer() {
        let dt = parse_epoch_millis("1609459200500").unwrap().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_609_459_200_500);
    }

    #[test]
    fn test_parse_epoch_millis_float_text() {
        let dt = parse_epoch_millis("1609459200000.0").unwrap().unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_epoch_millis_rejects_garbage() {
        let err = parse_epoch_millis("yesterday").unwrap_err();
        assert_eq!(err.to_string(), "Invalid timestamp: yesterday");
        assert!(parse_epoch_millis("NaN").is_err());
    }

    #[test]
    fn test_resolve_timezone_named() {
        assert_eq!(resolve_timezone("Europe/Berlin"), Tz::Europe__Berlin);
    }

    #[test]
    fn test_resolve_timezone_invalid_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Mars/Olympus_Mons"), Tz::UTC);
    }

    #[test]
    fn test_format_in_timezone() {
        let dt = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_in_timezone(dt, Tz::UTC), "2021-01-01 12:00:00 UTC");
        assert_eq!(
            format_in_timezone(dt, Tz::Europe__Berlin),
            "2021-01-01 13:00:00 CET"
        );
    }
}
