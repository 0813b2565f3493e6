use crate::KeyValueStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-local store. Nothing survives a restart, but one instance can be
/// shared between several sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::KeyValueStore;

    #[tokio::test]
    async fn last_write_wins() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("k").await.unwrap(), None);

        store.set_item("k", "1").await.unwrap();
        store.set_item("k", "2").await.unwrap();

        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }
}
