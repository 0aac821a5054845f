use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{
        collection::events::{BrowserEvent, IdleState},
        session::{
            reconcile::{reconcile, ReconcileOutcome},
            record::SessionRecord,
        },
        storage::{
            records::{load_record, recorded_days, save_record},
            KeyValueStore,
        },
    },
    utils::{
        clock::Clock,
        time::{date_key, saturating_add},
        url::clean_url,
    },
};

use super::module::EventProcessor;

/// Turns browser events into session changes of the current day's record.
///
/// The tracker remembers which url has focus and whether the user is idle. From that it derives
/// the url that should be timed and opens or closes sessions whenever it changes. The record is
/// saved after every change.
pub struct SiteTracker<S: KeyValueStore> {
    store: S,
    clock: Box<dyn Clock>,
    heartbeat: Duration,
    day: Option<(String, SessionRecord)>,
    focused_url: Option<Arc<str>>,
    idle: bool,
}

impl<S: KeyValueStore> SiteTracker<S> {
    pub fn new(store: S, clock: Box<dyn Clock>, heartbeat: std::time::Duration) -> Result<Self> {
        let heartbeat = Duration::from_std(heartbeat).context("Heartbeat interval is too long")?;
        Ok(Self {
            store,
            clock,
            heartbeat,
            day: None,
            focused_url: None,
            idle: false,
        })
    }

    /// Record of the day the tracker last worked on.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.day.as_ref().map(|(_, record)| record)
    }

    fn wanted_url(&self) -> Option<Arc<str>> {
        if self.idle {
            None
        } else {
            self.focused_url.clone()
        }
    }

    fn observe(&mut self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabActivated { url } | BrowserEvent::TabUpdated { url } => {
                self.focused_url = clean_url(&url);
                if self.focused_url.is_none() {
                    debug!("Not tracking {url}");
                }
            }
            BrowserEvent::WindowFocusChanged { url } => {
                self.focused_url = url.as_deref().and_then(clean_url);
            }
            BrowserEvent::IdleStateChanged { state } => {
                self.idle = state != IdleState::Active;
            }
        }
    }

    /// Closes the open session. The heartbeat correction runs first, so a gap the heartbeat
    /// didn't get to see yet (the machine just woke up) is dropped instead of credited.
    fn close_session(&self, record: &mut SessionRecord, now: DateTime<Utc>) -> Duration {
        let outcome = reconcile(record, self.heartbeat, now);
        let rest = record.end_session(now).unwrap_or_else(Duration::zero);
        let credited = saturating_add(outcome.credited(), rest);
        if let ReconcileOutcome::Implausible(gap) = outcome {
            info!("Dropped {gap} from the closing session, the tracker wasn't running");
        }
        credited
    }

    /// Start of `today`, or `now` when it can't be resolved. Time past it belongs to `today`.
    fn day_boundary(&self, today: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
        self.clock
            .day_start(today)
            .filter(|v| *v <= now)
            .unwrap_or(now)
    }

    /// Hands out the record `now` belongs to.
    ///
    /// When the day changes, a session still open in the previous record is closed there at
    /// midnight and continued in the new day's record from the same moment. On the first call a
    /// session left open by a previous run is closed, both in today's record and in the last
    /// recorded day before it.
    async fn take_day(&mut self, now: DateTime<Utc>) -> (String, SessionRecord) {
        let today = self.clock.local_date(now);
        let key = date_key(today);
        match self.day.take() {
            Some((current, record)) if current == key => (current, record),
            Some((previous, mut record)) => {
                info!("Day changed from {previous} to {key}");
                let boundary = self.day_boundary(today, now);
                let carried = record.active_url().cloned();
                if carried.is_some() {
                    self.close_session(&mut record, boundary);
                }
                if let Err(e) = save_record(&self.store, &previous, &record).await {
                    error!("Failed to close day {previous}: {e:?}");
                }

                let mut next = self.load_day(&key, now).await;
                if let Some(url) = carried {
                    next.start_session(url, boundary);
                }
                (key, next)
            }
            None => {
                self.close_earlier_day(&key, self.day_boundary(today, now))
                    .await;
                let record = self.load_day(&key, now).await;
                (key, record)
            }
        }
    }

    /// Rollover always closes the day it leaves, so only the last day before `key` can still
    /// hold a session from a run that crashed.
    async fn close_earlier_day(&self, key: &str, boundary: DateTime<Utc>) {
        let days = match recorded_days(&self.store).await {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to list recorded days: {e:?}");
                return;
            }
        };
        let Some(previous) = days.into_iter().rfind(|v| v.as_str() < key) else {
            return;
        };

        let mut record = load_record(&self.store, &previous).await;
        if !record.is_active() {
            return;
        }
        warn!(
            "Record {previous} has a session left open for {:?}, closing it",
            record.active_url()
        );
        self.close_session(&mut record, boundary);
        if let Err(e) = save_record(&self.store, &previous, &record).await {
            error!("Failed to close day {previous}: {e:?}");
        }
    }

    async fn load_day(&self, key: &str, now: DateTime<Utc>) -> SessionRecord {
        let mut record = load_record(&self.store, key).await;
        if record.is_active() {
            warn!(
                "Record {key} has a session left open for {:?}, closing it",
                record.active_url()
            );
            self.close_session(&mut record, now);
        }
        record
    }

    async fn store_day(&mut self, key: String, record: SessionRecord) -> Result<()> {
        let result = save_record(&self.store, &key, &record).await;
        self.day = Some((key, record));
        result
    }
}

impl<S: KeyValueStore> EventProcessor for SiteTracker<S> {
    async fn process_next(&mut self, event: BrowserEvent) -> Result<()> {
        let now = self.clock.time();
        self.observe(event);
        let wanted = self.wanted_url();

        let (key, mut record) = self.take_day(now).await;
        if record.active_url() != wanted.as_ref() {
            if let Some(active) = record.active_url().cloned() {
                let credited = self.close_session(&mut record, now);
                info!("Stopped tracking {active}, credited {credited}");
            }
            if let Some(url) = wanted {
                info!("Tracking {url}");
                record.start_session(url, now);
            }
        }
        self.store_day(key, record).await
    }

    async fn heartbeat(&mut self) -> Result<()> {
        let now = self.clock.time();
        let (key, mut record) = self.take_day(now).await;
        let outcome = reconcile(&mut record, self.heartbeat, now);
        debug!("Heartbeat {outcome:?}");
        self.store_day(key, record).await
    }

    async fn finalize(&mut self) -> Result<()> {
        let now = self.clock.time();
        let (key, mut record) = self.take_day(now).await;
        if let Some(active) = record.active_url().cloned() {
            let credited = self.close_session(&mut record, now);
            info!("Stopped tracking {active} on shutdown, credited {credited}");
        }
        self.store_day(key, record).await
    }
}
