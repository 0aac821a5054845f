use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, trace};

use super::KeyValueStore;

const EXTENSION: &str = "json";

/// The main realization of [KeyValueStore]. Every key is a separate file inside a directory.
///
/// Files are locked while they are read or written, so the tracker and the cli can touch the same
/// day at the same time.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            bail!("Key {key:?} can't be used as a file name");
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    async fn write_locked(file: &mut File, value: &[u8]) -> Result<()> {
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(value).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

/// Keys stay inside the store directory: no separators, no dots.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        trace!("Reading {path:?}");
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to open {path:?}")),
        };

        file.lock_shared()?;
        let mut value = String::new();
        let result = file.read_to_string(&mut value).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to read {path:?}"))?;

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        debug!("Writing {path:?}");
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {path:?} for writing"))?;

        // Truncation happens under the lock, readers never see a half-cleared file.
        file.lock_exclusive()?;
        let result = Self::write_locked(&mut file, value.as_bytes()).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to write {path:?}"))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        debug!("Removing {path:?}");
        match tokio::fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {path:?}")),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {:?}", self.dir))?;
        let mut keys = vec![];
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|v| v.to_str()) {
                if is_valid_key(key) {
                    keys.push(key.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
