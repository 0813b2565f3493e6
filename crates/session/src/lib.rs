//! Playback session management for a podcast player.
//!
//! [`PlaybackSessionManager`] is the only mutator of the native engine queue.
//! Everything that changes which track is loaded, where it is positioned, or
//! how fast it plays goes through one [`RunExclusive`] lane, and every
//! position change is written to the key-value store from inside that lane.

use podplay_core::{AppConfig, AppKilledBehavior};
use std::time::Duration;

pub mod bridge;
pub mod error;
pub mod exclusive;
pub mod manager;
pub mod persistence;

#[cfg(test)]
mod mock;

pub use bridge::RemoteControlBridge;
pub use error::{Result, SessionError};
pub use exclusive::RunExclusive;
pub use manager::PlaybackSessionManager;
pub use persistence::SessionStore;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ready_poll: Duration,
    pub ready_max_wait: Duration,
    pub progress_update_secs: f64,
    pub skip_forward_secs: f64,
    pub skip_backward_secs: f64,
    pub app_killed_behavior: AppKilledBehavior,
}

impl SessionConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            ready_poll: Duration::from_millis(cfg.intervals.ready_poll_ms.max(1)),
            ready_max_wait: Duration::from_millis(cfg.intervals.ready_max_wait_ms),
            progress_update_secs: cfg.intervals.progress_update_secs,
            skip_forward_secs: cfg.skip.forward_secs,
            skip_backward_secs: cfg.skip.backward_secs,
            app_killed_behavior: cfg.app_killed_behavior,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}
