use crate::error::{Result, SessionError};
use crate::exclusive::RunExclusive;
use crate::persistence::SessionStore;
use crate::SessionConfig;
use podplay_core::{clamp_position, PlaybackSpeed, PlaybackState, SessionPhase, Track};
use podplay_native::{AudioEngine, EngineEvent, EngineOptions, EngineTrack, KeyValueStore, Progress};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Session {
    phase: SessionPhase,
    track: Option<Track>,
    playback: PlaybackState,
    speed: PlaybackSpeed,
}

/// Owns the loaded track and its playback position.
///
/// Share it as `Arc<PlaybackSessionManager>`; every method takes `&self`.
pub struct PlaybackSessionManager {
    engine: Arc<dyn AudioEngine>,
    store: SessionStore,
    cfg: SessionConfig,
    init: OnceCell<()>,
    lane: RunExclusive,
    session: Mutex<Session>,
}

impl PlaybackSessionManager {
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        kv: Arc<dyn KeyValueStore>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            engine,
            store: SessionStore::new(kv),
            cfg,
            init: OnceCell::new(),
            lane: RunExclusive::new(),
            session: Mutex::new(Session::default()),
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.session().playback
    }

    pub fn current_track(&self) -> Option<Track> {
        self.session().track.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session().phase
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.session().speed
    }

    /// Registers a bounded listener for engine events with the engine.
    pub fn subscribe_events(&self, capacity: usize) -> mpsc::Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.engine.add_event_listener(tx);
        rx
    }

    /// Sets up the engine once. Callers arriving while setup is running wait
    /// for that attempt; after a failure the next call tries again.
    pub async fn initialize(&self) -> Result<()> {
        self.init.get_or_try_init(|| self.set_up_engine()).await?;
        Ok(())
    }

    async fn set_up_engine(&self) -> Result<()> {
        info!(engine = self.engine.name(), "setting up audio engine");
        self.engine.setup().await.map_err(SessionError::EngineSetup)?;
        self.engine
            .update_options(&EngineOptions::podcast(self.cfg.progress_update_secs))
            .await
            .map_err(SessionError::EngineSetup)?;
        self.engine
            .set_app_killed_behavior(self.cfg.app_killed_behavior)
            .await
            .map_err(SessionError::EngineSetup)?;

        let speed = match self.store.load_speed().await {
            Ok(speed) => speed.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "failed to restore playback speed");
                PlaybackSpeed::default()
            }
        };

        let mut session = self.session();
        session.speed = speed;
        if session.phase == SessionPhase::Uninitialized {
            session.phase = SessionPhase::Ready;
        }
        info!(%speed, "audio engine ready");
        Ok(())
    }

    /// Loads `track`, queueing behind any in-flight playback operation.
    pub async fn load_track(&self, track: Track) -> Result<()> {
        self.lane
            .run("load_track", async {
                self.initialize().await?;
                self.load_track_exclusive(track).await
            })
            .await
    }

    async fn load_track_exclusive(&self, track: Track) -> Result<()> {
        let outgoing = self.session().track.clone();
        if let Some(current) = outgoing {
            if current.id() == track.id() {
                return self.reload_same_track(&track).await;
            }
            let position = self.current_position().await;
            self.persist_position(current.id(), position).await;
        }

        info!(track_id = %track.id(), title = %track.title(), "loading track");
        {
            let mut session = self.session();
            session.phase = SessionPhase::Loading;
            session.track = None;
            session.playback = PlaybackState {
                duration: track.duration(),
                is_loading: true,
                ..PlaybackState::default()
            };
        }

        if let Err(source) = self.replace_queue(&track).await {
            return Err(self.fail_load(&track, source));
        }

        if let Err(err) = self.wait_until_ready(self.cfg.ready_max_wait).await {
            warn!(track_id = %track.id(), error = %err, "continuing load before engine is ready");
        }

        let duration = self.known_duration(track.duration()).await;
        let position = self.resume_position(track.id(), duration).await;
        if position > 0.0 {
            if let Err(err) = self.engine.seek_to(position).await {
                warn!(track_id = %track.id(), error = %err, "failed to restore position");
            }
        }

        let speed = self.session().speed;
        if let Err(err) = self.engine.set_rate(speed.as_f64()).await {
            warn!(track_id = %track.id(), error = %err, "failed to apply playback speed");
        }

        info!(track_id = %track.id(), position, %speed, "track loaded");
        let mut session = self.session();
        session.phase = SessionPhase::Loaded;
        session.track = Some(track);
        session.playback = PlaybackState {
            position,
            duration,
            ..PlaybackState::default()
        };
        Ok(())
    }

    async fn reload_same_track(&self, track: &Track) -> Result<()> {
        let queued = match self.engine.get_queue().await {
            Ok(queue) => queue.iter().any(|item| item.id == track.id()),
            Err(err) => {
                warn!(track_id = %track.id(), error = %err, "could not inspect engine queue");
                true
            }
        };
        if queued {
            debug!(track_id = %track.id(), "track already loaded");
            return Ok(());
        }

        debug!(track_id = %track.id(), "track missing from engine queue; adding it back");
        if let Err(source) = self.engine.add(EngineTrack::from(track)).await {
            return Err(self.fail_load(track, source));
        }
        let (position, speed) = {
            let mut session = self.session();
            session.phase = SessionPhase::Loaded;
            session.playback.is_playing = false;
            (session.playback.position, session.speed)
        };
        if position > 0.0 {
            if let Err(err) = self.engine.seek_to(position).await {
                warn!(track_id = %track.id(), error = %err, "failed to restore position");
            }
        }
        if let Err(err) = self.engine.set_rate(speed.as_f64()).await {
            warn!(track_id = %track.id(), error = %err, "failed to apply playback speed");
        }
        Ok(())
    }

    async fn replace_queue(&self, track: &Track) -> anyhow::Result<()> {
        self.engine.reset().await?;
        self.engine.add(EngineTrack::from(track)).await?;
        Ok(())
    }

    fn fail_load(&self, track: &Track, source: anyhow::Error) -> SessionError {
        warn!(track_id = %track.id(), error = %source, "track load failed");
        let mut session = self.session();
        session.phase = SessionPhase::Ready;
        session.track = None;
        session.playback = PlaybackState::default();
        SessionError::TrackLoad {
            track_id: track.id().to_string(),
            source,
        }
    }

    pub async fn play(&self) -> Result<()> {
        self.lane
            .run("play", async {
                self.initialize().await?;
                self.require_track()?;
                self.engine
                    .play()
                    .await
                    .map_err(|source| SessionError::Engine { op: "play", source })?;
                let mut session = self.session();
                session.phase = SessionPhase::Playing;
                session.playback.is_playing = true;
                Ok(())
            })
            .await
    }

    /// Pauses and stores the position reached.
    pub async fn pause(&self) -> Result<()> {
        self.lane
            .run("pause", async {
                self.initialize().await?;
                let track_id = self.require_track()?;
                self.engine
                    .pause()
                    .await
                    .map_err(|source| SessionError::Engine { op: "pause", source })?;
                {
                    let mut session = self.session();
                    session.phase = SessionPhase::Paused;
                    session.playback.is_playing = false;
                }
                let position = self.current_position().await;
                self.persist_position(&track_id, position).await;
                Ok(())
            })
            .await
    }

    pub async fn seek_to(&self, position: f64) -> Result<()> {
        self.lane
            .run("seek_to", self.seek_exclusive(position))
            .await
    }

    pub async fn skip_forward(&self, seconds: f64) -> Result<()> {
        self.lane
            .run("skip_forward", async {
                self.require_track()?;
                let target = self.current_position().await + seconds;
                self.seek_exclusive(target).await
            })
            .await
    }

    pub async fn skip_backward(&self, seconds: f64) -> Result<()> {
        self.lane
            .run("skip_backward", async {
                self.require_track()?;
                let target = self.current_position().await - seconds;
                self.seek_exclusive(target).await
            })
            .await
    }

    pub async fn skip_forward_default(&self) -> Result<()> {
        self.skip_forward(self.cfg.skip_forward_secs).await
    }

    pub async fn skip_backward_default(&self) -> Result<()> {
        self.skip_backward(self.cfg.skip_backward_secs).await
    }

    async fn seek_exclusive(&self, position: f64) -> Result<()> {
        let track_id = self.require_track()?;
        let duration = self.session().playback.duration;
        let target = clamp_position(position, duration);

        debug!(track_id = %track_id, requested = position, target, "seeking");
        self.engine
            .seek_to(target)
            .await
            .map_err(|source| SessionError::Engine {
                op: "seek_to",
                source,
            })?;
        self.session().playback.position = target;
        self.persist_position(&track_id, target).await;
        Ok(())
    }

    /// Rejects speeds outside [`PlaybackSpeed::SUPPORTED`] before touching
    /// the engine or the store.
    pub async fn set_speed(&self, speed: f64) -> Result<()> {
        let speed =
            PlaybackSpeed::try_from(speed).map_err(|err| SessionError::InvalidSpeed(err.0))?;
        self.lane
            .run("set_speed", async {
                self.initialize().await?;
                self.engine
                    .set_rate(speed.as_f64())
                    .await
                    .map_err(|source| SessionError::Engine {
                        op: "set_rate",
                        source,
                    })?;
                self.session().speed = speed;
                if let Err(err) = self.store.save_speed(speed).await {
                    warn!(%speed, error = %err, "failed to persist playback speed");
                }
                Ok(())
            })
            .await
    }

    /// Polls the engine until it knows the duration or leaves the
    /// `None`/`Loading` states.
    pub async fn wait_until_ready(&self, max_wait: Duration) -> Result<()> {
        let deadline = Instant::now() + max_wait;
        loop {
            if self.engine_reports_ready().await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::ReadyTimeout(max_wait));
            }
            tokio::time::sleep(self.cfg.ready_poll).await;
        }
    }

    async fn engine_reports_ready(&self) -> bool {
        match self.engine.get_progress().await {
            Ok(progress) if progress.duration > 0.0 => return true,
            Ok(_) => {}
            Err(err) => debug!(error = %err, "progress query failed while waiting"),
        }
        match self.engine.get_state().await {
            Ok(state) => state.is_ready(),
            Err(err) => {
                debug!(error = %err, "state query failed while waiting");
                false
            }
        }
    }

    /// Applies a progress report from the engine. Nothing is persisted.
    pub fn record_progress(&self, progress: Progress) {
        let mut session = self.session();
        if !session.phase.has_track() {
            return;
        }
        // Only a track loaded without a duration learns it from the engine.
        if session.playback.duration <= 0.0 && progress.duration > 0.0 {
            session.playback.duration = progress.duration;
        }
        let duration = session.playback.duration;
        session.playback.position = clamp_position(progress.position, duration);
        session.playback.buffered = clamp_position(progress.buffered, duration);
    }

    /// The engine ran out of queue.
    pub fn mark_ended(&self) {
        let mut session = self.session();
        if session.phase.has_track() {
            session.phase = SessionPhase::Paused;
            session.playback.is_playing = false;
        }
    }

    fn require_track(&self) -> Result<String> {
        self.session()
            .track
            .as_ref()
            .map(|track| track.id().to_string())
            .ok_or(SessionError::NoTrackLoaded)
    }

    /// Engine position when it answers, otherwise the last known one.
    async fn current_position(&self) -> f64 {
        match self.engine.get_progress().await {
            Ok(progress) => {
                let mut session = self.session();
                session.playback.position = progress.position.max(0.0);
                session.playback.buffered = progress.buffered.max(0.0);
                session.playback.position
            }
            Err(err) => {
                debug!(error = %err, "progress query failed; using last known position");
                self.session().playback.position
            }
        }
    }

    async fn known_duration(&self, declared: f64) -> f64 {
        if declared > 0.0 {
            return declared;
        }
        match self.engine.get_progress().await {
            Ok(progress) if progress.duration > 0.0 => progress.duration,
            _ => 0.0,
        }
    }

    async fn resume_position(&self, track_id: &str, duration: f64) -> f64 {
        match self.store.load_position(track_id).await {
            Ok(Some(record)) => clamp_position(record.position, duration),
            Ok(None) => 0.0,
            Err(err) => {
                warn!(track_id, error = %err, "failed to read stored position; starting over");
                0.0
            }
        }
    }

    async fn persist_position(&self, track_id: &str, position: f64) {
        if let Err(err) = self.store.save_position(track_id, position).await {
            warn!(track_id, position, error = %err, "failed to persist position");
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
