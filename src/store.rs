//! Durable knowledge collection.
//!
//! The whole collection is one pretty-printed JSON array of
//! [`SourceRecord`]s, rewritten on every append. Appends are serialized by an
//! async mutex held across load-modify-save, and each save goes to a
//! temporary sibling file that is renamed over the original.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::SourceRecord;

pub struct KnowledgeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl KnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// All records in ingestion order. A missing file is an empty collection.
    pub async fn load(&self) -> Result<Vec<SourceRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read knowledge store: {}", self.path.display())
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid knowledge store: {}", self.path.display()))
    }

    /// Append one record and persist the collection.
    pub async fn append(&self, record: SourceRecord) -> Result<()> {
        self.append_all(vec![record]).await
    }

    /// Append records in order with a single rewrite.
    pub async fn append_all(&self, new_records: Vec<SourceRecord>) -> Result<()> {
        if new_records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let added = new_records.len();
        records.extend(new_records);
        self.save(&records).await?;
        info!(
            path = %self.path.display(),
            added,
            total = records.len(),
            "knowledge store updated"
        );
        Ok(())
    }

    async fn save(&self, records: &[SourceRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(records)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write: {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace: {}", self.path.display()))?;
        debug!(path = %self.path.display(), records = records.len(), "saved knowledge store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(path: &str) -> SourceRecord {
        SourceRecord::new(
            SourceType::Text("txt".into()),
            path,
            "Plants need sunlight to grow.".to_string(),
        )
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = KnowledgeStore::new(tmp.path().join("kb.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_persists_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/kb.json");
        let store = KnowledgeStore::new(&path);
        store.append(record("a.txt")).await.unwrap();
        store.append(record("b.txt")).await.unwrap();

        let reopened = KnowledgeStore::new(&path);
        let records = reopened.load().await.unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.source_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert!(!tmp.path().join("nested/dir/kb.json.tmp").exists());
    }

    #[tokio::test]
    async fn stored_json_uses_extension_tags() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.json");
        let store = KnowledgeStore::new(&path);
        store.append(record("a.txt")).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["source_type"], "txt");
        assert_eq!(raw[0]["source_path"], "a.txt");
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(KnowledgeStore::new(tmp.path().join("kb.json")));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(record(&format!("{}.txt", i))).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.load().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(KnowledgeStore::new(&path).load().await.is_err());
    }
}
