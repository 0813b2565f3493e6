use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// One playable audio item. Fields are fixed at construction; switching
/// tracks means handing the session a new `Track`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    id: String,
    title: String,
    url: String,
    duration: f64,
    artwork: Option<String>,
    transcript: Option<String>,
}

impl Track {
    /// `duration` is in seconds; pass 0 when it is not known yet.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            duration: non_negative(duration),
            artwork: None,
            transcript: None,
        }
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn artwork(&self) -> Option<&str> {
        self.artwork.as_deref()
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }
}

/// Copy of the session's playback snapshot. All times are seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PlaybackState {
    pub position: f64,
    /// 0 means unknown.
    pub duration: f64,
    pub buffered: f64,
    pub is_playing: bool,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Ready,
    Loading,
    Loaded,
    Playing,
    Paused,
}

impl SessionPhase {
    pub fn has_track(self) -> bool {
        matches!(self, Self::Loaded | Self::Playing | Self::Paused)
    }
}

/// What the native engine does with playback when the host app is killed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppKilledBehavior {
    #[default]
    ContinuePlayback,
    PausePlayback,
    StopPlaybackAndRemoveNotification,
}

/// Stored resume point for a single track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PersistedPosition {
    pub position: f64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl PersistedPosition {
    pub fn at(position: f64, now: SystemTime) -> Self {
        let updated_at = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            position: non_negative(position),
            updated_at,
        }
    }
}

/// Stored speed applied to every track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlobalSpeed {
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsupportedSpeed(pub f64);

impl fmt::Display for UnsupportedSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported playback speed {}", self.0)
    }
}

impl std::error::Error for UnsupportedSpeed {}

/// A playback rate drawn from [`PlaybackSpeed::SUPPORTED`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    pub const SUPPORTED: [f64; 7] = [0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];
    pub const NORMAL: PlaybackSpeed = PlaybackSpeed(1.0);

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for PlaybackSpeed {
    type Error = UnsupportedSpeed;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::SUPPORTED
            .iter()
            .find(|s| (*s - value).abs() < 1e-6)
            .map(|s| PlaybackSpeed(*s))
            .ok_or(UnsupportedSpeed(value))
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl From<PlaybackSpeed> for GlobalSpeed {
    fn from(speed: PlaybackSpeed) -> Self {
        Self { speed: speed.0 }
    }
}

/// Clamps `position` into `[0, duration]`. A duration of 0 is treated as
/// unknown and leaves the upper end open.
pub fn clamp_position(position: f64, duration: f64) -> f64 {
    let position = non_negative(position);
    if duration > 0.0 {
        position.min(duration)
    } else {
        position
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
