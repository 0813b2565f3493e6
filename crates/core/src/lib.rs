pub mod config;
pub mod keys;
pub mod model;

pub use config::{AppConfig, ConfigIntervals, SkipConfig};
pub use model::{
    clamp_position, AppKilledBehavior, GlobalSpeed, PersistedPosition, PlaybackSpeed,
    PlaybackState, SessionPhase, Track, UnsupportedSpeed,
};
