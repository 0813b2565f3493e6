use anyhow::{Context, Result};
use podplay_core::keys::{position_key, GLOBAL_SPEED_KEY};
use podplay_core::{GlobalSpeed, PersistedPosition, PlaybackSpeed};
use podplay_native::KeyValueStore;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;

/// Typed access to the two records the session keeps in the key-value store.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load_position(&self, track_id: &str) -> Result<Option<PersistedPosition>> {
        let key = position_key(track_id);
        let Some(raw) = self.kv.get_item(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw).with_context(|| format!("bad record at {key}"))?;
        Ok(Some(record))
    }

    pub async fn save_position(&self, track_id: &str, position: f64) -> Result<()> {
        let record = PersistedPosition::at(position, SystemTime::now());
        let value = serde_json::to_string(&record)?;
        self.kv.set_item(&position_key(track_id), &value).await
    }

    /// A stored value outside the supported set reads as `None`.
    pub async fn load_speed(&self) -> Result<Option<PlaybackSpeed>> {
        let Some(raw) = self.kv.get_item(GLOBAL_SPEED_KEY).await? else {
            return Ok(None);
        };
        let record: GlobalSpeed = serde_json::from_str(&raw)
            .with_context(|| format!("bad record at {GLOBAL_SPEED_KEY}"))?;
        match PlaybackSpeed::try_from(record.speed) {
            Ok(speed) => Ok(Some(speed)),
            Err(err) => {
                warn!(error = %err, "ignoring stored playback speed");
                Ok(None)
            }
        }
    }

    pub async fn save_speed(&self, speed: PlaybackSpeed) -> Result<()> {
        let value = serde_json::to_string(&GlobalSpeed::from(speed))?;
        self.kv.set_item(GLOBAL_SPEED_KEY, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStore;
    use podplay_core::PlaybackSpeed;
    use podplay_native::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn writes_the_documented_json_shapes() {
        let kv = Arc::new(MemoryStore::new());
        let store = SessionStore::new(kv.clone());

        store.save_position("unit-1", 50.0).await.unwrap();
        store
            .save_speed(PlaybackSpeed::try_from(1.25).unwrap())
            .await
            .unwrap();

        let raw = kv
            .get_item("podcast_player:unit:unit-1:position")
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["position"], 50.0);
        assert!(value["updatedAt"].as_i64().unwrap() > 0);

        let raw = kv.get_item("podcast_player:global_speed").await.unwrap();
        assert_eq!(raw.as_deref(), Some(r#"{"speed":1.25}"#));
    }

    #[tokio::test]
    async fn unsupported_stored_speed_reads_as_missing() {
        let kv = Arc::new(MemoryStore::new());
        kv.set_item("podcast_player:global_speed", r#"{"speed":3.5}"#)
            .await
            .unwrap();

        let store = SessionStore::new(kv);
        assert_eq!(store.load_speed().await.unwrap(), None);
    }

    #[tokio::test]
    async fn garbage_position_is_an_error() {
        let kv = Arc::new(MemoryStore::new());
        kv.set_item("podcast_player:unit:x:position", "{")
            .await
            .unwrap();

        let store = SessionStore::new(kv);
        assert!(store.load_position("x").await.is_err());
        assert_eq!(store.load_position("y").await.unwrap(), None);
    }
}
