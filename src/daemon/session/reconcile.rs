use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::record::SessionRecord;

/// How a heartbeat tick treated the time since the previous check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing was being tracked.
    Inactive,
    /// The tick arrived on time, elapsed time was credited.
    Normal(Duration),
    /// The tick was late but not by more than one interval. Elapsed time is still credited in
    /// full.
    Delayed(Duration),
    /// The gap is too long to be a late tick. Most likely the system was asleep, nothing was
    /// credited.
    Implausible(Duration),
}

impl ReconcileOutcome {
    /// Time added to the record by the tick.
    pub fn credited(&self) -> Duration {
        match self {
            ReconcileOutcome::Normal(v) | ReconcileOutcome::Delayed(v) => *v,
            ReconcileOutcome::Inactive | ReconcileOutcome::Implausible(_) => Duration::zero(),
        }
    }
}

/// Heartbeat correction of a record.
///
/// Credits the open session with the time passed since it started or since the previous tick,
/// whichever is shorter. Gaps longer than two intervals are dropped, since a tab that stayed
/// "active" while the machine slept shouldn't collect those hours. The check time always advances
/// to `now`.
pub fn reconcile(
    record: &mut SessionRecord,
    interval: Duration,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let outcome = match (record.active_url().cloned(), record.elapsed(now)) {
        (Some(url), Some(elapsed)) => {
            let outcome = if elapsed <= interval {
                ReconcileOutcome::Normal(elapsed)
            } else if elapsed <= interval.checked_mul(2).unwrap_or(Duration::MAX) {
                ReconcileOutcome::Delayed(elapsed)
            } else {
                info!("Heartbeat gap of {elapsed} for {url} is too long, skipping it");
                ReconcileOutcome::Implausible(elapsed)
            };
            let credited = outcome.credited();
            if credited > Duration::zero() {
                record.add_time(url, credited);
            }
            outcome
        }
        _ => ReconcileOutcome::Inactive,
    };

    debug!("Reconciled at {now}: {outcome:?}");
    record.set_last_check_time(now);
    outcome
}
