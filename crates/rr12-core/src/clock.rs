//! The decoder's notion of "now".
//!
//! The original hardware keeps local time; this emulation derives it from
//! UTC plus a configured hour offset. The offset is configuration, not a
//! constant, so deployments outside the original timezone stay correct.

use chrono::{NaiveDateTime, TimeDelta, Utc};

/// Current decoder time: UTC shifted by `offset_hours`.
pub fn decoder_time(offset_hours: i64) -> NaiveDateTime {
    (Utc::now() + TimeDelta::hours(offset_hours)).naive_utc()
}

/// Format a timestamp the way the RR12 protocol writes times: `hh:mm:ss.kkk`.
pub fn time_field(ts: NaiveDateTime) -> String {
    ts.format("%H:%M:%S%.3f").to_string()
}

/// Format a timestamp the way the RR12 protocol writes dates: `yyyy-mm-dd`.
pub fn date_field(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_milli_opt(14, 5, 9, 7)
            .unwrap()
    }

    #[test]
    fn time_field_has_millisecond_precision() {
        assert_eq!(time_field(sample()), "14:05:09.007");
    }

    #[test]
    fn date_field_is_iso_formatted() {
        assert_eq!(date_field(sample()), "2025-03-09");
    }

    #[test]
    fn decoder_time_applies_hour_offset() {
        let plain = decoder_time(0);
        let shifted = decoder_time(11);
        let delta = shifted - plain;
        // Both calls happen within the same second in practice; allow slack.
        assert!(delta >= TimeDelta::hours(11) - TimeDelta::seconds(1));
        assert!(delta <= TimeDelta::hours(11) + TimeDelta::seconds(1));
    }
}
