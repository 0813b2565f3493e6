use crate::{AudioEngine, EngineEvent, EngineOptions, EngineState, EngineTrack, Progress};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use podplay_core::AppKilledBehavior;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// In-process stand-in for a platform player. The clock only runs while
/// playing and scales with the rate.
pub struct SimulatedEngine {
    load_latency: Duration,
    inner: Mutex<Inner>,
}

struct Inner {
    set_up: bool,
    queue: Vec<EngineTrack>,
    loaded_at: Option<Instant>,
    base_position: f64,
    playing_since: Option<Instant>,
    rate: f64,
    listeners: Vec<mpsc::Sender<EngineEvent>>,
}

impl SimulatedEngine {
    pub fn new(load_latency: Duration) -> Self {
        Self {
            load_latency,
            inner: Mutex::new(Inner {
                set_up: false,
                queue: Vec::new(),
                loaded_at: None,
                base_position: 0.0,
                playing_since: None,
                rate: 1.0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Pushes `event` to every live listener, as a lock screen would.
    pub fn emit(&self, event: EngineEvent) {
        let mut inner = self.inner();
        inner.listeners.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(?event, "engine event dropped; listener is full");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_set_up(inner: &Inner) -> Result<()> {
        if inner.set_up {
            Ok(())
        } else {
            Err(anyhow!("player is not set up"))
        }
    }
}

impl Inner {
    fn duration(&self) -> f64 {
        self.queue.first().map(|t| t.duration).unwrap_or(0.0)
    }

    fn position(&self, now: Instant) -> f64 {
        let elapsed = self
            .playing_since
            .map(|since| now.duration_since(since).as_secs_f64() * self.rate)
            .unwrap_or(0.0);
        let position = self.base_position + elapsed;
        let duration = self.duration();
        if duration > 0.0 {
            position.min(duration)
        } else {
            position
        }
    }

    fn settle(&mut self, now: Instant) {
        self.base_position = self.position(now);
        if self.playing_since.is_some() {
            self.playing_since = Some(now);
        }
    }

    fn is_loading(&self, now: Instant, latency: Duration) -> bool {
        self.loaded_at
            .map(|at| now.duration_since(at) < latency)
            .unwrap_or(false)
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn setup(&self) -> Result<()> {
        let mut inner = self.inner();
        if inner.set_up {
            return Err(anyhow!("the player has already been initialized"));
        }
        inner.set_up = true;
        Ok(())
    }

    async fn update_options(&self, options: &EngineOptions) -> Result<()> {
        Self::ensure_set_up(&self.inner())?;
        debug!(capabilities = options.capabilities.len(), "player options updated");
        Ok(())
    }

    async fn set_app_killed_behavior(&self, behavior: AppKilledBehavior) -> Result<()> {
        debug!(?behavior, "app killed behavior set");
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner();
        Self::ensure_set_up(&inner)?;
        inner.queue.clear();
        inner.loaded_at = None;
        inner.base_position = 0.0;
        inner.playing_since = None;
        Ok(())
    }

    async fn add(&self, track: EngineTrack) -> Result<()> {
        let mut inner = self.inner();
        Self::ensure_set_up(&inner)?;
        if inner.queue.is_empty() {
            inner.loaded_at = Some(Instant::now());
            inner.base_position = 0.0;
        }
        inner.queue.push(track);
        Ok(())
    }

    async fn get_queue(&self) -> Result<Vec<EngineTrack>> {
        Ok(self.inner().queue.clone())
    }

    async fn play(&self) -> Result<()> {
        let mut inner = self.inner();
        if inner.queue.is_empty() {
            return Err(anyhow!("queue is empty"));
        }
        if inner.playing_since.is_none() {
            inner.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.inner();
        inner.settle(Instant::now());
        inner.playing_since = None;
        Ok(())
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        let mut inner = self.inner();
        let now = Instant::now();
        if inner.queue.is_empty() || inner.is_loading(now, self.load_latency) {
            // Real players drop seeks issued before the item is ready.
            debug!(position, "seek ignored; nothing ready");
            return Ok(());
        }
        inner.base_position = position.max(0.0);
        if inner.playing_since.is_some() {
            inner.playing_since = Some(now);
        }
        Ok(())
    }

    async fn set_rate(&self, rate: f64) -> Result<()> {
        let mut inner = self.inner();
        inner.settle(Instant::now());
        inner.rate = rate;
        Ok(())
    }

    async fn get_progress(&self) -> Result<Progress> {
        let inner = self.inner();
        let now = Instant::now();
        if inner.queue.is_empty() || inner.is_loading(now, self.load_latency) {
            return Ok(Progress::default());
        }
        let duration = inner.duration();
        Ok(Progress {
            position: inner.position(now),
            duration,
            buffered: duration,
        })
    }

    async fn get_state(&self) -> Result<EngineState> {
        let inner = self.inner();
        let now = Instant::now();
        let state = if inner.queue.is_empty() {
            EngineState::None
        } else if inner.is_loading(now, self.load_latency) {
            EngineState::Loading
        } else if inner.playing_since.is_some() {
            EngineState::Playing
        } else {
            EngineState::Ready
        };
        Ok(state)
    }

    fn add_event_listener(&self, listener: mpsc::Sender<EngineEvent>) {
        self.inner().listeners.push(listener);
    }
}
