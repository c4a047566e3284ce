//! Timestamp helpers.
//!
//! Notes carry ISO-8601 strings; this module produces them and turns them
//! back into short labels for list rendering ("Today", "Yesterday",
//! "3 days ago", or a calendar date).

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Current time as an ISO-8601 string with millisecond precision.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}

pub fn format_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the plain `YYYY-MM-DD HH:MM:SS` form (taken as UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Short label for how long ago `timestamp` was, relative to `now`.
///
/// Returns None if the timestamp cannot be parsed.
pub fn humanize(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let dt = parse_timestamp(timestamp)?;
    let elapsed = now.signed_duration_since(dt).num_milliseconds().abs();
    // Whole days, rounded up: anything within the last 24h counts as one.
    let days = (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;

    let label = match days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => dt.format("%Y-%m-%d").to_string(),
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_iso() {
        assert_eq!(format_iso(now()), "2026-03-15T12:00:00.000Z");
    }

    #[test]
    fn test_parse_rfc3339_and_plain() {
        assert_eq!(parse_timestamp("2026-03-15T12:00:00.000Z"), Some(now()));
        assert_eq!(parse_timestamp("2026-03-15 12:00:00"), Some(now()));
        assert_eq!(parse_timestamp("2026-03-15T14:00:00+02:00"), Some(now()));
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_humanize_recent() {
        let ts = format_iso(now() - Duration::hours(3));
        assert_eq!(humanize(&ts, now()).as_deref(), Some("Today"));

        let ts = format_iso(now());
        assert_eq!(humanize(&ts, now()).as_deref(), Some("Today"));
    }

    #[test]
    fn test_humanize_yesterday_and_days_ago() {
        let ts = format_iso(now() - Duration::hours(30));
        assert_eq!(humanize(&ts, now()).as_deref(), Some("Yesterday"));

        let ts = format_iso(now() - Duration::days(4) - Duration::hours(1));
        assert_eq!(humanize(&ts, now()).as_deref(), Some("4 days ago"));
    }

    #[test]
    fn test_humanize_old_date() {
        let ts = format_iso(now() - Duration::days(30));
        assert_eq!(humanize(&ts, now()).as_deref(), Some("2026-02-13"));
    }

    #[test]
    fn test_humanize_invalid() {
        assert!(humanize("yesterday-ish", now()).is_none());
    }
}
