use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::utils::time::saturating_add;

/// Time spent on a single origin during one day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UrlEntry {
    pub url: Arc<str>,
    #[serde(with = "duration_ms", default = "Duration::zero")]
    pub total_time: Duration,
}

impl UrlEntry {
    pub fn new(url: impl Into<Arc<str>>, total_time: Duration) -> Self {
        Self {
            url: url.into(),
            total_time,
        }
    }
}

/// Tracking state of a single calendar day.
///
/// A session is open when both `active_url` and `start_time` are set. Every mutation goes through
/// the methods below, which keep both fields in step and never lower a total. The record is saved
/// in full after every mutation, so it can't outlive the tracker in a half-written state.
#[derive(PartialEq, Eq, Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    active_url: Option<Arc<str>>,
    last_active_url: Option<Arc<str>>,
    start_time: Option<DateTime<Utc>>,
    last_check_time: Option<DateTime<Utc>>,
    entries: Vec<UrlEntry>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_url(&self) -> Option<&Arc<str>> {
        self.active_url.as_ref()
    }

    /// Url of the most recently closed session. Stays in place until the next session closes.
    pub fn last_active_url(&self) -> Option<&Arc<str>> {
        self.last_active_url.as_ref()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        self.last_check_time
    }

    pub fn entries(&self) -> &[UrlEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<UrlEntry> {
        self.entries
    }

    pub fn is_active(&self) -> bool {
        self.active_url.is_some() && self.start_time.is_some()
    }

    /// Sum of all entries. Doesn't include the running session.
    pub fn total_time(&self) -> Duration {
        self.entries
            .iter()
            .fold(Duration::zero(), |sum, entry| saturating_add(sum, entry.total_time))
    }

    /// Inserts an empty entry for `url` unless there is one already. Returns whether an entry was
    /// inserted.
    pub fn append_or_create(&mut self, url: Arc<str>) -> bool {
        if self.entries.iter().any(|v| v.url == url) {
            return false;
        }
        self.entries.push(UrlEntry::new(url, Duration::zero()));
        true
    }

    /// Opens a session for `url`.
    ///
    /// Callers are expected to close the previous session first. Tab events can race though, so an
    /// open session is reported and overwritten instead of rejected.
    pub fn start_session(&mut self, url: Arc<str>, now: DateTime<Utc>) {
        if self.active_url.is_some() || self.start_time.is_some() {
            warn!(
                active_url = ?self.active_url,
                start_time = ?self.start_time,
                next_url = %url,
                "Starting a session while another one is still open"
            );
        }
        debug!("Starting session for {url} at {now}");
        self.active_url = Some(url);
        self.start_time = Some(now);
    }

    /// Closes the open session, crediting its elapsed time to the url's entry. Returns the credited
    /// time, or [None] when there was nothing to close.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        let Some(url) = self.active_url.take() else {
            warn!("Ending a session while none is open");
            return None;
        };

        let elapsed = match self.start_time.take() {
            Some(start) => heartbeat_elapsed(start, self.last_check_time, now),
            None => {
                warn!("Session for {url} has no start time, crediting nothing");
                Duration::zero()
            }
        };

        debug!("Ending session for {url} at {now}, adding {elapsed}");
        self.add_time(url.clone(), elapsed);
        self.last_active_url = Some(url);
        Some(elapsed)
    }

    /// Time the open session would be credited if it closed at `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.start_time
            .filter(|_| self.active_url.is_some())
            .map(|start| heartbeat_elapsed(start, self.last_check_time, now))
    }

    pub(super) fn add_time(&mut self, url: Arc<str>, elapsed: Duration) {
        let elapsed = elapsed.max(Duration::zero());
        match self.entries.iter_mut().find(|v| v.url == url) {
            Some(entry) => entry.total_time = saturating_add(entry.total_time, elapsed),
            None => self.entries.push(UrlEntry::new(url, elapsed)),
        }
    }

    pub(super) fn set_last_check_time(&mut self, now: DateTime<Utc>) {
        self.last_check_time = Some(now);
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored record. Malformed input is reported and produces [None]; callers fall back
    /// to a fresh record.
    pub fn from_json_string(value: &str) -> Option<Self> {
        match serde_json::from_str::<SessionRecord>(value) {
            Ok(record) => Some(record.repaired()),
            Err(e) => {
                error!("Failed to parse stored session record: {e}");
                None
            }
        }
    }

    /// Restores invariants a hand-edited or partially written record may have lost. Totals of
    /// merged duplicates saturate instead of overflowing.
    fn repaired(mut self) -> Self {
        if self.active_url.is_some() != self.start_time.is_some() {
            warn!(
                active_url = ?self.active_url,
                start_time = ?self.start_time,
                "Stored record has a half-open session, dropping it"
            );
            self.active_url = None;
            self.start_time = None;
        }

        let mut entries: Vec<UrlEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entries.iter_mut().find(|v| v.url == entry.url) {
                Some(existing) => {
                    warn!("Merging duplicate entry for {}", entry.url);
                    existing.total_time = saturating_add(existing.total_time, entry.total_time);
                }
                None => entries.push(entry),
            }
        }
        self.entries = entries;
        self
    }
}

/// Plain elapsed time between two moments. An `end` before `start` means one of them is
/// corrupted, which yields [None] instead of a negative span.
pub fn calc_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Duration> {
    let elapsed = end - start;
    if elapsed < Duration::zero() {
        None
    } else {
        Some(elapsed)
    }
}

/// Elapsed time of a session bounded by the last heartbeat.
///
/// Time up to `last_check` was already credited by the heartbeat, so only the shorter of the two
/// spans is counted. Moments in the future of `now` count as zero.
pub fn heartbeat_elapsed(
    start: DateTime<Utc>,
    last_check: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Duration {
    let since_start = (now - start).max(Duration::zero());
    match last_check {
        Some(check) => since_start.min((now - check).max(Duration::zero())),
        None => since_start,
    }
}

mod duration_ms {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        // Totals never go below zero.
        Ok(Duration::milliseconds(ms.max(0)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use serde_json::Value;

    use super::{calc_elapsed, heartbeat_elapsed, SessionRecord, UrlEntry};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2025, 5, 18).unwrap(), NaiveTime::MIN);

    fn t0() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    #[test]
    fn test_calc_elapsed_simple() {
        let start = t0();
        assert_eq!(
            calc_elapsed(start, start + Duration::minutes(3)),
            Some(Duration::minutes(3))
        );
        assert_eq!(calc_elapsed(start, start), Some(Duration::zero()));
        assert_eq!(calc_elapsed(start + Duration::seconds(1), start), None);
    }

    #[test]
    fn test_heartbeat_elapsed_takes_shorter_span() {
        let start = t0();
        let check = start + Duration::minutes(8);
        let now = start + Duration::minutes(10);
        assert_eq!(
            heartbeat_elapsed(start, Some(check), now),
            Duration::minutes(2)
        );
        // Heartbeat before the session started.
        assert_eq!(
            heartbeat_elapsed(check, Some(start), now),
            Duration::minutes(2)
        );
        assert_eq!(heartbeat_elapsed(start, None, now), Duration::minutes(10));
    }

    #[test]
    fn test_heartbeat_elapsed_never_negative() {
        let now = t0();
        let future = now + Duration::minutes(5);
        assert_eq!(heartbeat_elapsed(future, None, now), Duration::zero());
        assert_eq!(
            heartbeat_elapsed(now - Duration::minutes(5), Some(future), now),
            Duration::zero()
        );
    }

    #[test]
    fn test_end_session_on_fresh_record() {
        let mut record = SessionRecord::new();
        assert_eq!(record.end_session(t0()), None);
        assert!(record.entries().is_empty());
        assert_eq!(record.last_active_url(), None);
    }

    #[test]
    fn test_session_end_to_end() {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        assert!(record.is_active());

        let credited = record.end_session(t0() + Duration::minutes(10));

        assert_eq!(credited, Some(Duration::milliseconds(600_000)));
        assert_eq!(
            record.entries(),
            &[UrlEntry::new("a.com", Duration::milliseconds(600_000))]
        );
        assert_eq!(record.active_url(), None);
        assert_eq!(record.start_time(), None);
        assert_eq!(record.last_active_url().map(|v| &**v), Some("a.com"));
    }

    #[test]
    fn test_sessions_accumulate_into_one_entry() {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        record.end_session(t0() + Duration::minutes(1));
        record.start_session("b.com".into(), t0() + Duration::minutes(1));
        record.end_session(t0() + Duration::minutes(3));
        record.start_session("a.com".into(), t0() + Duration::minutes(3));
        record.end_session(t0() + Duration::minutes(6));

        assert_eq!(
            record.entries(),
            &[
                UrlEntry::new("a.com", Duration::minutes(4)),
                UrlEntry::new("b.com", Duration::minutes(2)),
            ]
        );
        assert_eq!(record.total_time(), Duration::minutes(6));
        assert_eq!(record.last_active_url().map(|v| &**v), Some("a.com"));
    }

    #[test]
    fn test_start_session_overwrites_open_session() {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        record.start_session("b.com".into(), t0() + Duration::minutes(1));

        assert_eq!(record.active_url().map(|v| &**v), Some("b.com"));
        assert_eq!(record.start_time(), Some(t0() + Duration::minutes(1)));
        assert!(record.entries().is_empty());
        assert_eq!(record.last_active_url(), None);
    }

    #[test]
    fn test_end_session_bounded_by_last_check() {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        record.set_last_check_time(t0() + Duration::minutes(9));

        assert_eq!(
            record.end_session(t0() + Duration::minutes(10)),
            Some(Duration::minutes(1))
        );
    }

    #[test]
    fn test_end_session_with_start_in_future() {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0() + Duration::hours(1));

        assert_eq!(record.end_session(t0()), Some(Duration::zero()));
        assert_eq!(record.entries(), &[UrlEntry::new("a.com", Duration::zero())]);
    }

    #[test]
    fn test_append_or_create_idempotent() {
        let mut record = SessionRecord::new();
        assert!(record.append_or_create("a.com".into()));
        assert!(!record.append_or_create("a.com".into()));
        assert_eq!(record.entries().len(), 1);
        assert_eq!(record.entries()[0].total_time, Duration::zero());
    }

    #[test]
    fn test_json_round_trip() -> anyhow::Result<()> {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        record.set_last_check_time(t0() + Duration::minutes(2));
        record.end_session(t0() + Duration::minutes(3));
        record.start_session("http://b.com".into(), t0() + Duration::minutes(4));

        let restored = SessionRecord::from_json_string(&record.to_json_string()?);

        assert_eq!(restored, Some(record));
        Ok(())
    }

    #[test]
    fn test_json_field_names() -> anyhow::Result<()> {
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), t0());
        record.end_session(t0() + Duration::seconds(90));

        let value: Value = serde_json::from_str(&record.to_json_string()?)?;

        assert_eq!(
            value,
            serde_json::json!({
                "activeUrl": null,
                "lastActiveUrl": "a.com",
                "startTime": null,
                "lastCheckTime": null,
                "entries": [{ "url": "a.com", "totalTime": 90000 }],
            })
        );
        Ok(())
    }

    #[test]
    fn test_from_json_accepts_browser_timestamps() {
        let record = SessionRecord::from_json_string(
            r#"{"activeUrl":"a.com","startTime":"2025-05-18T10:00:00.000Z","entries":[]}"#,
        )
        .unwrap();

        assert_eq!(record.active_url().map(|v| &**v), Some("a.com"));
        assert_eq!(
            record.start_time(),
            Some(Utc.with_ymd_and_hms(2025, 5, 18, 10, 0, 0).unwrap())
        );
        assert_eq!(record.last_active_url(), None);
        assert_eq!(record.last_check_time(), None);
    }

    #[test]
    fn test_from_json_defaults_missing_fields() {
        assert_eq!(
            SessionRecord::from_json_string("{}"),
            Some(SessionRecord::new())
        );
        let record = SessionRecord::from_json_string(r#"{"entries":[{"url":"a.com"}]}"#).unwrap();
        assert_eq!(record.entries(), &[UrlEntry::new("a.com", Duration::zero())]);
    }

    #[test]
    fn test_from_json_malformed() {
        assert_eq!(SessionRecord::from_json_string("{\"activeUrl\":"), None);
        assert_eq!(SessionRecord::from_json_string("\"text\""), None);
        assert_eq!(
            SessionRecord::from_json_string(r#"{"startTime":"yesterday-ish"}"#),
            None
        );
    }

    #[test]
    fn test_from_json_repairs_invariants() {
        let record = SessionRecord::from_json_string(
            r#"{
                "activeUrl": "a.com",
                "startTime": null,
                "entries": [
                    {"url": "a.com", "totalTime": 1000},
                    {"url": "b.com", "totalTime": -50},
                    {"url": "a.com", "totalTime": 500}
                ]
            }"#,
        )
        .unwrap();

        assert!(!record.is_active());
        assert_eq!(record.active_url(), None);
        assert_eq!(
            record.entries(),
            &[
                UrlEntry::new("a.com", Duration::milliseconds(1500)),
                UrlEntry::new("b.com", Duration::zero()),
            ]
        );
    }

    #[test]
    fn test_from_json_saturates_overflowing_totals() {
        let mut record = SessionRecord::from_json_string(
            r#"{"entries":[{"url":"a.com","totalTime":9223372036854775807},{"url":"a.com","totalTime":5},{"url":"b.com","totalTime":9223372036854775807}]}"#,
        )
        .unwrap();

        assert_eq!(record.entries()[0], UrlEntry::new("a.com", Duration::MAX));
        assert_eq!(record.total_time(), Duration::MAX);

        record.start_session("a.com".into(), t0());
        assert_eq!(
            record.end_session(t0() + Duration::minutes(1)),
            Some(Duration::minutes(1))
        );
        assert_eq!(record.entries()[0].total_time, Duration::MAX);
    }
}
