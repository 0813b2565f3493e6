use anyhow::Result;
use async_trait::async_trait;
use podplay_core::{AppKilledBehavior, Track};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use file_store::JsonFileStore;
pub use memory::MemoryStore;
pub use simulated::SimulatedEngine;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EngineState {
    None,
    Loading,
    Buffering,
    Ready,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl EngineState {
    pub fn is_ready(self) -> bool {
        !matches!(self, EngineState::None | EngineState::Loading)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Progress {
    pub position: f64,
    pub duration: f64,
    pub buffered: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Capability {
    Play,
    Pause,
    Stop,
    SeekTo,
    SkipToNext,
    SkipToPrevious,
    JumpForward,
    JumpBackward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub capabilities: Vec<Capability>,
    pub compact_capabilities: Vec<Capability>,
    pub progress_update_interval_secs: f64,
}

impl EngineOptions {
    pub fn podcast(progress_update_interval_secs: f64) -> Self {
        Self {
            capabilities: vec![
                Capability::Play,
                Capability::Pause,
                Capability::Stop,
                Capability::SeekTo,
                Capability::SkipToNext,
                Capability::SkipToPrevious,
                Capability::JumpForward,
                Capability::JumpBackward,
            ],
            compact_capabilities: vec![
                Capability::Play,
                Capability::Pause,
                Capability::JumpForward,
                Capability::JumpBackward,
            ],
            progress_update_interval_secs,
        }
    }
}

/// The item shape handed to the engine queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineTrack {
    pub id: String,
    pub url: String,
    pub title: String,
    pub artwork: Option<String>,
    pub duration: f64,
}

impl From<&Track> for EngineTrack {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id().to_string(),
            url: track.url().to_string(),
            title: track.title().to_string(),
            artwork: track.artwork().map(str::to_string),
            duration: track.duration(),
        }
    }
}

/// Events the engine pushes to registered listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RemotePlay,
    RemotePause,
    RemoteStop,
    RemoteSeek { position: f64 },
    RemotePrevious,
    RemoteNext,
    RemoteJumpForward { interval: f64 },
    RemoteJumpBackward { interval: f64 },
    ProgressUpdated(Progress),
    QueueEnded,
}

/// The platform audio player. Its queue is not re-entrant: callers must not
/// overlap `reset` and `add`.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    fn name(&self) -> &'static str;
    async fn setup(&self) -> Result<()>;
    async fn update_options(&self, options: &EngineOptions) -> Result<()>;
    async fn set_app_killed_behavior(&self, behavior: AppKilledBehavior) -> Result<()>;
    async fn reset(&self) -> Result<()>;
    async fn add(&self, track: EngineTrack) -> Result<()>;
    async fn get_queue(&self) -> Result<Vec<EngineTrack>>;
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn seek_to(&self, position: f64) -> Result<()>;
    async fn set_rate(&self, rate: f64) -> Result<()>;
    async fn get_progress(&self) -> Result<Progress>;
    async fn get_state(&self) -> Result<EngineState>;
    fn add_event_listener(&self, listener: mpsc::Sender<EngineEvent>);
}

/// Durable string storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

mod file_store;
mod memory;
mod simulated;
