//! JSON-lines cold store.
//!
//! Appends one line per archived signal. A batch is written with a single
//! append and fsynced before `export` returns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{ArchiveEntry, ColdStoreError, ColdStorePort};

/// Cold store writing to an append-only JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonLinesColdStore {
    path: PathBuf,
}

impl JsonLinesColdStore {
    /// Store appending to `path`. Parent directories are created on first export.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Archive file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line cannot be decoded.
    pub async fn read_all(&self) -> Result<Vec<ArchiveEntry>, ColdStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ColdStoreError::Io(e.to_string())),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| ColdStoreError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl ColdStorePort for JsonLinesColdStore {
    async fn export(&self, entries: &[ArchiveEntry]) -> Result<(), ColdStoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut buffer, entry)
                .map_err(|e| ColdStoreError::Serialization(e.to_string()))?;
            buffer.push(b'\n');
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ColdStoreError::Io(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ColdStoreError::Io(e.to_string()))?;
        file.write_all(&buffer)
            .await
            .map_err(|e| ColdStoreError::Io(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| ColdStoreError::Io(e.to_string()))?;

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "Exported archive entries"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_lifecycle::SignalStatus;
    use crate::domain::signal_lifecycle::aggregate::test_support::signal_in;
    use chrono::Utc;

    fn entry(id: &str) -> ArchiveEntry {
        ArchiveEntry {
            signal: signal_in(id, "AAPL", SignalStatus::Expired),
            records: Vec::new(),
            archived_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn appends_across_exports() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesColdStore::new(dir.path().join("nested/archive.jsonl"));

        store.export(&[entry("sig-1"), entry("sig-2")]).await.unwrap();
        store.export(&[entry("sig-3")]).await.unwrap();

        let entries = store.read_all().await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.signal.id().as_str()).collect();
        assert_eq!(ids, vec!["sig-1", "sig-2", "sig-3"]);
        assert_eq!(entries[2].signal.status(), SignalStatus::Expired);
    }

    #[tokio::test]
    async fn entry_survives_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesColdStore::new(dir.path().join("archive.jsonl"));
        let original = entry("sig-1");

        store.export(std::slice::from_ref(&original)).await.unwrap();

        assert_eq!(store.read_all().await.unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesColdStore::new(dir.path().join("none.jsonl"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesColdStore::new(dir.path());
        let err = store.export(&[entry("sig-1")]).await.unwrap_err();
        assert!(matches!(err, ColdStoreError::Io(_)));
    }
}
