use chrono::{Duration, NaiveDate};
use futures::StreamExt;

use crate::{
    daemon::{
        session::{aggregate::UrlTime, record::UrlEntry},
        storage::{records::load_days, KeyValueStore},
    },
    utils::time::{date_key, saturating_add},
};

/// Loads entries of every day between `start` (inclusive) and `end` (inclusive). Days without a
/// record come back empty.
pub async fn collect_days(
    store: impl KeyValueStore,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(String, Vec<UrlEntry>)> {
    let keys = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(date_key)
        .collect::<Vec<_>>();
    load_days(store, keys).collect().await
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes(), v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds())
    }
}

/// Share of `value` in `whole`, in whole percents.
pub fn share_percentage(value: Duration, whole: Duration) -> i64 {
    if whole <= Duration::zero() {
        return 0;
    }
    let share = i128::from(value.num_milliseconds()) * 100 / i128::from(whole.num_milliseconds());
    share.try_into().unwrap_or(i64::MAX)
}

pub fn total_of<T: UrlTime>(entries: &[T]) -> Duration {
    entries
        .iter()
        .fold(Duration::zero(), |sum, v| saturating_add(sum, v.total_time()))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::daemon::{
        session::record::SessionRecord,
        storage::{memory_store::MemoryStore, records::save_record},
    };

    use super::{collect_days, format_duration, share_percentage};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(125)), "2m5s");
        assert_eq!(
            format_duration(Duration::hours(26) + Duration::seconds(61)),
            "26h1m1s"
        );
    }

    #[test]
    fn test_share_percentage() {
        assert_eq!(share_percentage(Duration::minutes(1), Duration::minutes(3)), 33);
        assert_eq!(share_percentage(Duration::minutes(1), Duration::zero()), 0);
        assert_eq!(share_percentage(Duration::MAX, Duration::MAX), 100);
    }

    #[tokio::test]
    async fn test_collect_days_covers_range() -> Result<()> {
        let store = MemoryStore::new();
        let mut record = SessionRecord::new();
        let start = Utc.with_ymd_and_hms(2025, 5, 17, 12, 0, 0).unwrap();
        record.start_session("a.com".into(), start);
        record.end_session(start + Duration::minutes(1));
        save_record(&store, "2025-05-17", &record).await?;

        let days = collect_days(
            &store,
            NaiveDate::from_ymd_opt(2025, 5, 16).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 18).unwrap(),
        )
        .await;

        let keys = days.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["2025-05-16", "2025-05-17", "2025-05-18"]);
        assert_eq!(days[1].1.len(), 1);
        assert!(days[2].1.is_empty());
        Ok(())
    }
}
