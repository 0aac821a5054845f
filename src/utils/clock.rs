use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::Instant;

use super::time::day_start;

/// Time source of the application. Everything that needs "now" asks the clock for it, which
/// lets tests replace wall-clock time with a controlled one.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    /// Calendar day a moment belongs to. Days are local, so a session at 23:30 is counted for the
    /// day the user sees on their calendar.
    fn local_date(&self, time: DateTime<Utc>) -> NaiveDate {
        time.with_timezone(&Local).date_naive()
    }

    /// Moment `date` begins, in the same time zone as [Clock::local_date].
    fn day_start(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        day_start(date, &Local).map(|v| v.with_timezone(&Utc))
    }

    async fn sleep_until(&self, instant: Instant);
}

#[derive(Clone, Copy)]
pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
