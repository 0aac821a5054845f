use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::error;

use crate::utils::url::clean_url;

use super::KeyValueStore;

pub const BLOCK_LIST_KEY: &str = "blocked";

/// Sites the user marked as blocked. This is plain data, nothing is enforced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlockList {
    origins: Vec<Arc<str>>,
}

impl BlockList {
    /// Reads the block list. Failures are logged and produce an empty list.
    pub async fn load(store: &impl KeyValueStore) -> Self {
        let value = match store.get(BLOCK_LIST_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return Self::default(),
            Err(e) => {
                error!("Failed to read block list: {e:?}");
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<Arc<str>>>(&value) {
            Ok(origins) => Self { origins },
            Err(e) => {
                error!("Block list is malformed: {e}");
                Self::default()
            }
        }
    }

    pub async fn save(&self, store: &impl KeyValueStore) -> Result<()> {
        store
            .set(BLOCK_LIST_KEY, serde_json::to_string(&self.origins)?)
            .await
            .context("Failed to save block list")
    }

    pub fn origins(&self) -> &[Arc<str>] {
        &self.origins
    }

    /// Adds the origin of `url`. Returns whether it wasn't blocked before.
    pub fn add(&mut self, url: &str) -> Result<bool> {
        let origin = Self::origin_of(url).ok_or_else(|| anyhow!("{url:?} is not a valid url"))?;
        if self.origins.contains(&origin) {
            return Ok(false);
        }
        self.origins.push(origin);
        Ok(true)
    }

    /// Removes `url`, given either as a full url or as a stored origin. Returns whether anything
    /// was removed.
    pub fn remove(&mut self, url: &str) -> bool {
        let origin = Self::origin_of(url);
        let before = self.origins.len();
        self.origins
            .retain(|v| **v != *url && Some(v) != origin.as_ref());
        before != self.origins.len()
    }

    /// Accepts both full urls and bare hosts, since stored origins don't carry `https://`.
    fn origin_of(url: &str) -> Option<Arc<str>> {
        clean_url(url).or_else(|| clean_url(&format!("https://{url}")))
    }
}
