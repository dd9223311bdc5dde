//! Display conveniences for renderers. The read model itself stays unformatted.

use chrono::{DateTime, Utc};

/// Countdown as `m:ss`. Negative input renders as `0:00`.
#[must_use]
pub fn format_countdown(remaining_secs: i64) -> String {
    let secs = remaining_secs.max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Elapsed time as `Xm Ys`, truncated to whole seconds.
#[must_use]
pub fn format_time_taken(time_taken_ms: i64) -> String {
    let secs = time_taken_ms.max(0) / 1000;
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Completion timestamp as `DD-MM-YYYY • HH:MM:SS` (UTC).
#[must_use]
pub fn format_completed_at(completed_at: DateTime<Utc>) -> String {
    completed_at.format("%d-%m-%Y • %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn countdown_pads_seconds() {
        assert_eq!(format_countdown(20 * 60), "20:00");
        assert_eq!(format_countdown(65), "1:05");
        assert_eq!(format_countdown(9), "0:09");
        assert_eq!(format_countdown(-3), "0:00");
    }

    #[test]
    fn time_taken_truncates_millis() {
        assert_eq!(format_time_taken(0), "0m 0s");
        assert_eq!(format_time_taken(125_999), "2m 5s");
    }

    #[test]
    fn completed_at_is_day_first() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(format_completed_at(ts), "07-03-2024 • 09:05:01");
    }
}
