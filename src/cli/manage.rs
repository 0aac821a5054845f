use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;

use crate::{
    daemon::{
        session::record::SessionRecord,
        storage::{
            block_list::BlockList,
            records::{cleanup_older_than, load_record},
            KeyValueStore,
        },
    },
    utils::{
        clock::{Clock, DefaultClock},
        time::{date_key, saturating_add},
    },
};

use super::output::format_duration;

#[derive(Debug, Subcommand)]
pub enum BlockCommand {
    #[command(about = "Add a site to the block list")]
    Add { url: String },
    #[command(about = "Remove a site from the block list")]
    Remove { url: String },
    #[command(about = "Show blocked sites")]
    List,
}

/// Time recorded today, counting the open session up to `now`.
fn tracked_today(record: &SessionRecord, now: DateTime<Utc>) -> Duration {
    saturating_add(
        record.total_time(),
        record.elapsed(now).unwrap_or_else(Duration::zero),
    )
}

/// Command to process `status`. Shows what is being tracked right now.
pub async fn process_status_command(store: impl KeyValueStore) -> Result<()> {
    let clock = DefaultClock;
    let now = clock.time();
    let key = date_key(clock.local_date(now));
    let record = load_record(&store, &key).await;

    match (record.active_url(), record.start_time()) {
        (Some(url), Some(start)) => println!(
            "Tracking {url} since {}",
            start.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        _ => println!("Not tracking anything"),
    }
    if let Some(url) = record.last_active_url() {
        println!("Last active {url}");
    }
    println!(
        "Today ({key}) {} on {} sites",
        format_duration(tracked_today(&record, now)),
        record.entries().len()
    );
    Ok(())
}

/// Command to process `block`.
pub async fn process_block_command(store: impl KeyValueStore, command: BlockCommand) -> Result<()> {
    match apply_block_command(&store, command).await? {
        BlockOutcome::Listed(origins) if origins.is_empty() => println!("No blocked sites"),
        BlockOutcome::Listed(origins) => origins.iter().for_each(|v| println!("{v}")),
        BlockOutcome::Changed(url) => println!("Updated block list with {url}"),
        BlockOutcome::Unchanged(url) => println!("Block list already up to date for {url}"),
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum BlockOutcome {
    Listed(Vec<String>),
    Changed(String),
    Unchanged(String),
}

async fn apply_block_command(
    store: &impl KeyValueStore,
    command: BlockCommand,
) -> Result<BlockOutcome> {
    let mut list = BlockList::load(store).await;
    let (changed, url) = match command {
        BlockCommand::List => {
            return Ok(BlockOutcome::Listed(
                list.origins().iter().map(|v| v.to_string()).collect(),
            ))
        }
        BlockCommand::Add { url } => (list.add(&url)?, url),
        BlockCommand::Remove { url } => (list.remove(&url), url),
    };

    if !changed {
        return Ok(BlockOutcome::Unchanged(url));
    }
    list.save(store).await?;
    Ok(BlockOutcome::Changed(url))
}

/// Command to process `cleanup`. Removes day records older than `retention_days`.
pub async fn process_cleanup_command(store: impl KeyValueStore, retention_days: u32) -> Result<()> {
    let clock = DefaultClock;
    let today = clock.local_date(clock.time());
    let removed = cleanup_older_than(&store, retention_days, today).await?;
    println!("Removed {} records", removed.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};

    use crate::daemon::{
        session::record::SessionRecord,
        storage::{block_list::BlockList, memory_store::MemoryStore},
    };

    use super::{apply_block_command, tracked_today, BlockCommand, BlockOutcome};

    #[test]
    fn test_tracked_today_includes_open_session() {
        let start = Utc.with_ymd_and_hms(2025, 5, 18, 10, 0, 0).unwrap();
        let mut record = SessionRecord::new();
        record.start_session("a.com".into(), start);
        record.end_session(start + Duration::minutes(10));
        record.start_session("b.com".into(), start + Duration::minutes(20));

        assert_eq!(
            tracked_today(&record, start + Duration::minutes(25)),
            Duration::minutes(15)
        );
    }

    #[tokio::test]
    async fn test_block_commands() -> Result<()> {
        let store = MemoryStore::new();

        let added = apply_block_command(
            &store,
            BlockCommand::Add {
                url: "https://news.example.com/today".into(),
            },
        )
        .await?;
        assert_eq!(
            added,
            BlockOutcome::Changed("https://news.example.com/today".into())
        );

        let again = apply_block_command(
            &store,
            BlockCommand::Add {
                url: "news.example.com".into(),
            },
        )
        .await?;
        assert_eq!(again, BlockOutcome::Unchanged("news.example.com".into()));

        let listed = apply_block_command(&store, BlockCommand::List).await?;
        assert_eq!(listed, BlockOutcome::Listed(vec!["news.example.com".into()]));

        apply_block_command(
            &store,
            BlockCommand::Remove {
                url: "news.example.com".into(),
            },
        )
        .await?;
        assert!(BlockList::load(&store).await.origins().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_block_add_rejects_garbage() {
        let store = MemoryStore::new();
        let result = apply_block_command(
            &store,
            BlockCommand::Add {
                url: "not a url at all".into(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
