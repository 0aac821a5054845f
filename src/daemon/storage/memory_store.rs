use std::{collections::BTreeMap, sync::Mutex};

use anyhow::{anyhow, Result};

use super::KeyValueStore;

/// [KeyValueStore] kept in memory. Nothing survives the process, which makes it handy for tests
/// and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Memory store lock is poisoned"))?;
        Ok(f(&mut values))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_values(|values| values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.with_values(|values| {
            values.insert(key.to_string(), value);
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_values(|values| {
            values.remove(key);
        })
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        self.with_values(|values| values.keys().cloned().collect())
    }
}
