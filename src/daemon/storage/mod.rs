//!  Storage is organized around a [KeyValueStore].
//!  The basic idea is:
//!   - Every calendar day has its own key (`YYYY-MM-DD`) holding that day's session record as JSON.
//!   - The block list lives under one fixed key.
//!   - Retention is a matter of removing old day keys, see [records::cleanup_older_than].

pub mod block_list;
pub mod file_store;
pub mod memory_store;
pub mod records;

use std::{future::Future, ops::Deref};

use anyhow::Result;

/// Interface for abstracting persistence. Values are JSON documents.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, or [None] if there is none.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    fn list_keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl<T: Deref> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        self.deref().set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        self.deref().remove(key)
    }

    fn list_keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.deref().list_keys()
    }
}
