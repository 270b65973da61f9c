//! Timestamp conversions for record fields.
//!
//! On the wire a timestamp is a bare number of Unix epoch seconds (UTC),
//! possibly fractional. In memory it is a `chrono::DateTime<Utc>`.

use chrono::{DateTime, Utc};

use crate::value::Value;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Display format used by record `Display` impls (millisecond precision).
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Converts epoch seconds to a UTC timestamp.
///
/// Sub-second precision is rounded to microseconds, which is what an `f64`
/// can carry for present-day epochs. Returns `None` for non-finite or
/// out-of-range input.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let micros = (seconds * MICROS_PER_SECOND).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Rounds `time` to the nearest microsecond, the precision a wire
/// timestamp keeps.
#[must_use]
pub fn round_to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    let micros = time.timestamp_micros();
    let micros = if time.timestamp_subsec_nanos() % 1_000 >= 500 {
        micros.saturating_add(1)
    } else {
        micros
    };
    DateTime::from_timestamp_micros(micros).unwrap_or(time)
}

/// Converts a UTC timestamp to fractional epoch seconds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_epoch(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9
}

/// Reads a wire timestamp from an integer or float body value.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Int(i) => from_epoch(*i as f64),
        Value::Float(f) => from_epoch(*f),
        _ => None,
    }
}

/// Converts a timestamp to its wire value.
#[must_use]
pub fn to_value(time: &DateTime<Utc>) -> Value {
    Value::Float(to_epoch(time))
}

/// Renders a timestamp as `YYYY-mm-dd HH:MM:SS.mmm`.
#[must_use]
pub fn format(time: &DateTime<Utc>) -> String {
    time.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_epoch_fractional() {
        let time = from_epoch(2.35).unwrap();
        assert_eq!(format(&time), "1970-01-01 00:00:02.350");
    }

    #[test]
    fn test_round_to_micros() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let time = base + chrono::Duration::nanoseconds(551_828_381);
        let rounded = round_to_micros(time);
        assert_eq!(rounded, base + chrono::Duration::microseconds(551_828));
        assert_eq!(round_to_micros(rounded), rounded);
        assert_eq!(
            round_to_micros(base + chrono::Duration::nanoseconds(1_500)),
            base + chrono::Duration::microseconds(2)
        );
    }

    #[test]
    fn test_nanosecond_time_survives_after_rounding() {
        let time = Utc.with_ymd_and_hms(2031, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::nanoseconds(999_999_499);
        let rounded = round_to_micros(time);
        assert_eq!(from_epoch(to_epoch(&rounded)), Some(rounded));
    }

    #[test]
    fn test_epoch_round_trip() {
        let time = Utc.with_ymd_and_hms(2012, 10, 5, 12, 30, 15).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(from_epoch(to_epoch(&time)), Some(time));
    }

    #[test]
    fn test_from_value_accepts_int_and_float() {
        assert_eq!(
            from_value(&Value::Int(100)),
            Some(Utc.timestamp_opt(100, 0).unwrap())
        );
        assert!(from_value(&Value::Float(100.5)).is_some());
        assert!(from_value(&Value::from("100")).is_none());
    }

    #[test]
    fn test_non_finite_is_rejected() {
        assert!(from_epoch(f64::NAN).is_none());
        assert!(from_epoch(f64::INFINITY).is_none());
        assert!(from_epoch(1e300).is_none());
    }
}
