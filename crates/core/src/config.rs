use crate::model::AppKilledBehavior;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

fn default_event_channel_capacity() -> usize {
    32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigIntervals {
    pub ready_poll_ms: u64,
    pub ready_max_wait_ms: u64,
    pub progress_update_secs: f64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            ready_poll_ms: 100,
            ready_max_wait_ms: 5_000,
            progress_update_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub forward_secs: f64,
    pub backward_secs: f64,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            forward_secs: 30.0,
            backward_secs: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub store_path: Option<PathBuf>,
    pub app_killed_behavior: AppKilledBehavior,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    pub intervals: ConfigIntervals,
    pub skip: SkipConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            store_path: None,
            app_killed_behavior: AppKilledBehavior::default(),
            event_channel_capacity: default_event_channel_capacity(),
            intervals: ConfigIntervals::default(),
            skip: SkipConfig::default(),
        }
    }
}
