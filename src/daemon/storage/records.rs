use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::{stream, Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::daemon::session::{
    aggregate::{filter_valid_date_keys, partition_by_date_window},
    record::{SessionRecord, UrlEntry},
};

use super::KeyValueStore;

/// Loads the record stored under `key`. A missing, unreadable or malformed record is replaced with
/// a fresh one, failures are only logged.
pub async fn load_record(store: &impl KeyValueStore, key: &str) -> SessionRecord {
    match store.get(key).await {
        Ok(Some(value)) => SessionRecord::from_json_string(&value).unwrap_or_else(|| {
            warn!("Record {key} is malformed, starting a fresh one");
            SessionRecord::new()
        }),
        Ok(None) => {
            debug!("No record for {key} yet");
            SessionRecord::new()
        }
        Err(e) => {
            error!("Failed to read record {key}: {e:?}");
            SessionRecord::new()
        }
    }
}

pub async fn save_record(
    store: &impl KeyValueStore,
    key: &str,
    record: &SessionRecord,
) -> Result<()> {
    store
        .set(key, record.to_json_string()?)
        .await
        .with_context(|| format!("Failed to save record {key}"))
}

/// Date keys that have a record, oldest first.
pub async fn recorded_days(store: &impl KeyValueStore) -> Result<Vec<String>> {
    let mut keys = filter_valid_date_keys(store.list_keys().await?);
    keys.sort();
    Ok(keys)
}

/// Loads entries of several days. Days are fetched a few at a time and come out in the order of
/// `keys`.
pub fn load_days(
    store: impl KeyValueStore,
    keys: Vec<String>,
) -> impl Stream<Item = (String, Vec<UrlEntry>)> {
    let store = Arc::new(store);
    stream::iter(keys)
        .map(move |key| {
            let store = store.clone();
            async move {
                let record = load_record(&store, &key).await;
                (key, record.into_entries())
            }
        })
        .buffered(4)
}

/// Removes records older than `retention_days` before `today`. Keys that aren't dates are never
/// touched. Returns removed keys.
#[instrument(skip(store))]
pub async fn cleanup_older_than(
    store: &impl KeyValueStore,
    retention_days: u32,
    today: NaiveDate,
) -> Result<Vec<String>> {
    let (old, _) = partition_by_date_window(recorded_days(store).await?, retention_days, today);

    let mut removed = Vec::with_capacity(old.len());
    for key in old {
        match store.remove(&key).await {
            Ok(_) => {
                info!("Removed record {key}");
                removed.push(key);
            }
            Err(e) => error!("Failed to remove record {key}: {e:?}"),
        }
    }
    Ok(removed)
}
