use crate::KeyValueStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Keeps the whole key space in one JSON object on disk. Every write
/// rewrites the file through a sibling temp file and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => serde_json::from_str(&data)
                .with_context(|| format!("failed to parse store {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        debug!(path = %path.display(), keys = items.len(), "opened key-value store");
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub async fn keys(&self) -> Vec<String> {
        self.items.lock().await.keys().cloned().collect()
    }

    async fn flush(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("failed to create store directory {}", parent.display())
                })?;
            }
        }
        let data = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value.to_string());
        self.flush(&items).await
    }
}
