use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("audio engine setup failed: {0}")]
    EngineSetup(#[source] anyhow::Error),

    #[error("failed to load track {track_id}: {source}")]
    TrackLoad {
        track_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported playback speed {0}")]
    InvalidSpeed(f64),

    #[error("audio engine not ready after {0:?}")]
    ReadyTimeout(Duration),

    #[error("no track is loaded")]
    NoTrackLoaded,

    #[error("audio engine {op} failed: {source}")]
    Engine {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
