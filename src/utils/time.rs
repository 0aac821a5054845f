use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// This is the standard way of converting a date to a store key in sitetally.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// First moment of `date` in `tz`. [None] when midnight doesn't exist there (DST gap).
pub fn day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
}

/// Adds two spans, stopping at [Duration::MAX] instead of overflowing. Stored totals come from
/// files and may be arbitrarily large.
pub fn saturating_add(a: Duration, b: Duration) -> Duration {
    a.checked_add(&b).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{date_key, day_start, saturating_add};

    #[test]
    fn test_date_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(date_key(date), "2025-03-07");
    }

    #[test]
    fn test_day_start() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 19).unwrap();
        assert_eq!(
            day_start(date, &Utc),
            Some(Utc.with_ymd_and_hms(2025, 5, 19, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_saturating_add() {
        assert_eq!(
            saturating_add(Duration::seconds(1), Duration::seconds(2)),
            Duration::seconds(3)
        );
        assert_eq!(
            saturating_add(Duration::MAX, Duration::milliseconds(5)),
            Duration::MAX
        );
    }
}
