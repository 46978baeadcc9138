//! Per-user chat logs stored as JSON arrays.
//!
//! Each user has one file, `<dir>/<user>.json`, holding an ordered array of
//! [`ChatEntry`]s. Saves rewrite the whole file (via a temporary file and a
//! rename). Appends are read-modify-write and are serialized within one
//! process; separate processes writing the same log are not coordinated.
//!
//! A log that fails to parse is renamed to
//! `<user>.json.corrupt-<timestamp>` and treated as empty.

use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::ChatEntry;

pub const DEFAULT_USER: &str = "default";

/// Check that `user` is safe to use as a file stem.
pub fn validate_user(user: &str) -> Result<&str> {
    if user.is_empty() || user.len() > 64 {
        bail!("invalid user name: must be 1-64 characters");
    }
    if !user
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("invalid user name: only letters, digits, '-' and '_' are allowed");
    }
    Ok(user)
}

pub struct HistoryStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, user: &str) -> Result<PathBuf> {
        let user = validate_user(user)?;
        Ok(self.dir.join(format!("{}.json", user)))
    }

    /// Load a user's log. Missing files and corrupted content both yield an empty log.
    pub async fn load(&self, user: &str) -> Result<Vec<ChatEntry>> {
        let path = self.path_for(user)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        match serde_json::from_slice::<Vec<ChatEntry>>(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "chat history is corrupted, starting fresh");
                quarantine(&path).await;
                Ok(Vec::new())
            }
        }
    }

    /// Replace a user's log with `entries`.
    pub async fn save(&self, user: &str, entries: &[ChatEntry]) -> Result<()> {
        let path = self.path_for(user)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Append one entry and return the updated log.
    pub async fn append(&self, user: &str, entry: ChatEntry) -> Result<Vec<ChatEntry>> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(user).await?;
        entries.push(entry);
        self.save(user, &entries).await?;
        Ok(entries)
    }

    /// Delete a user's log. Returns whether a log existed.
    pub async fn clear(&self, user: &str) -> Result<bool> {
        let path = self.path_for(user)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

async fn quarantine(path: &Path) {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(".corrupt-{}", stamp));
    let aside = PathBuf::from(aside);

    if let Err(e) = tokio::fs::rename(path, &aside).await {
        tracing::warn!(path = %path.display(), error = %e, "could not move corrupted chat history aside");
    } else {
        tracing::info!(moved_to = %aside.display(), "corrupted chat history moved aside");
    }
}
