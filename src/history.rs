//! Local download history kept by the client.
//!
//! The gateway never touches this; only the CLI client records downloads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

const HISTORY_MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub url: String,
    pub filename: String,
    pub downloaded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        let downloaded_at = Utc::now();
        Self {
            id: downloaded_at.timestamp_millis().max(0) as u64,
            url: url.into(),
            filename: filename.into(),
            downloaded_at,
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Records an entry at the front of the list.
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryEntry>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<HistoryEntry>>;
    /// Returns whether an entry with `id` existed.
    async fn remove(&self, id: u64) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
}

/// History persisted as a pretty-printed JSON array.
pub struct JsonFileHistory {
    path: PathBuf,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse history at {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read history at {}", self.path.display())),
        }
    }

    async fn persist(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, payload)
            .await
            .with_context(|| format!("Failed to write history at {}", self.path.display()))
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistory {
    async fn append(&self, mut entry: HistoryEntry) -> Result<HistoryEntry> {
        let mut entries = self.load().await?;

        // Ids are millisecond stamps; bump past any collision.
        if let Some(max_id) = entries.iter().map(|e| e.id).max() {
            if entry.id <= max_id {
                entry.id = max_id + 1;
            }
        }

        entries.insert(0, entry.clone());
        entries.truncate(HISTORY_MAX_ENTRIES);
        self.persist(&entries).await?;
        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        self.load().await
    }

    async fn remove(&self, id: u64) -> Result<bool> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(id: u64, url: &str) -> HistoryEntry {
        HistoryEntry {
            id,
            url: url.to_string(),
            filename: format!("tiktok-{id}.mp4"),
            downloaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_file_lists_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("history.json"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_puts_newest_first() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("history.json"));

        store.append(entry(1, "https://vm.tiktok.com/a")).await.unwrap();
        store.append(entry(2, "https://x.com/u/status/2")).await.unwrap();

        let urls: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["https://x.com/u/status/2", "https://vm.tiktok.com/a"]);
    }

    #[tokio::test]
    async fn colliding_ids_are_bumped() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("history.json"));

        store.append(entry(10, "a")).await.unwrap();
        let second = store.append(entry(10, "b")).await.unwrap();
        assert_eq!(second.id, 11);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("history.json");
        let store = JsonFileHistory::new(&path);

        store.append(entry(1, "a")).await.unwrap();
        store.append(entry(2, "b")).await.unwrap();

        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert!(store.list().await.unwrap().is_empty());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn entries_use_camel_case_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = JsonFileHistory::new(&path);
        store.append(entry(5, "a")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"downloadedAt\""));
    }

    #[tokio::test]
    async fn list_is_capped() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::new(dir.path().join("history.json"));
        let many: Vec<HistoryEntry> = (0..HISTORY_MAX_ENTRIES as u64 + 5)
            .map(|id| entry(id, "u"))
            .collect();
        store.persist(&many).await.unwrap();

        store.append(entry(0, "new")).await.unwrap();
        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), HISTORY_MAX_ENTRIES);
        assert_eq!(entries[0].url, "new");
    }
}
