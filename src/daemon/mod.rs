use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use collection::source::{EventSource, JsonLinesSource};
use processing::{tracker::SiteTracker, TrackingModule};
use storage::{file_store::FileStore, KeyValueStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::utils::{
    clock::{Clock, DefaultClock},
    dir::records_dir,
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod session;
pub mod shutdown;
pub mod storage;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(120);

/// Represents the starting point for the tracker. Browser events are read from stdin until the
/// browser closes it or the process is asked to stop.
pub async fn start_daemon(dir: PathBuf, heartbeat: Duration) -> Result<()> {
    let store = FileStore::new(records_dir(&dir))?;
    info!("Tracking into {:?}", store.dir());

    let shutdown_token = CancellationToken::new();
    let module = create_tracking_module(
        JsonLinesSource::stdin(),
        store,
        &shutdown_token,
        heartbeat,
        DefaultClock,
    )?;

    let watcher = tokio::spawn(shutdown::detect_shutdown(shutdown_token.clone()));
    let result = module.run().await;
    watcher.abort();

    result.inspect_err(|e| error!("Tracking module got an error {e:?}"))
}

fn create_tracking_module<E: EventSource, S: KeyValueStore>(
    source: E,
    store: S,
    shutdown_token: &CancellationToken,
    heartbeat: Duration,
    clock: impl Clock + Clone,
) -> Result<TrackingModule<E, SiteTracker<S>>> {
    let tracker = SiteTracker::new(store, Box::new(clock.clone()), heartbeat)?;
    Ok(TrackingModule::new(
        source,
        tracker,
        shutdown_token.clone(),
        heartbeat,
        Box::new(clock),
    ))
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tokio::{sync::mpsc, time::Instant};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            collection::events::{BrowserEvent, IdleState},
            create_tracking_module,
            session::record::UrlEntry,
            storage::{memory_store::MemoryStore, records::load_record},
        },
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    );

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        fn local_date(&self, time: DateTime<Utc>) -> NaiveDate {
            time.date_naive()
        }

        fn day_start(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
            crate::utils::time::day_start(date, &Utc)
        }

        async fn sleep_until(&self, instant: Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    /// Runs the whole tracking loop on paused time: five minutes on one site with two heartbeats
    /// in between, a minute and a half on another, then the user goes idle.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_tracking() -> Result<()> {
        *TEST_LOGGING;
        let (sender, receiver) = mpsc::channel::<BrowserEvent>(10);
        let test_clock = TestClock {
            start_time: Utc.from_utc_datetime(&TEST_START_DATE),
            reference: Instant::now(),
        };
        let store = Arc::new(MemoryStore::new());
        let shutdown_token = CancellationToken::new();

        let module = create_tracking_module(
            receiver,
            store.clone(),
            &shutdown_token,
            Duration::from_secs(120),
            test_clock,
        )?;

        let (_, tracking_result) = tokio::join!(
            async move {
                let events = [
                    (BrowserEvent::TabActivated { url: "https://mail.example.com/inbox".into() }, 300),
                    (BrowserEvent::TabActivated { url: "https://docs.example.com/d/1".into() }, 90),
                    (BrowserEvent::IdleStateChanged { state: IdleState::Idle }, 60),
                ];
                for (event, wait) in events {
                    sender.send(event).await.unwrap();
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
            },
            module.run(),
        );
        tracking_result?;

        let record = load_record(&store, "2018-07-04").await;
        assert_eq!(
            record.entries(),
            &[
                UrlEntry::new("mail.example.com", chrono::Duration::minutes(5)),
                UrlEntry::new("docs.example.com", chrono::Duration::seconds(90)),
            ]
        );
        assert!(!record.is_active());
        assert_eq!(
            record.last_active_url().map(|v| &**v),
            Some("docs.example.com")
        );

        Ok(())
    }
}
