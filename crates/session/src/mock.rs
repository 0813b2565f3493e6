use anyhow::{anyhow, Result};
use async_trait::async_trait;
use podplay_core::AppKilledBehavior;
use podplay_native::{
    AudioEngine, EngineEvent, EngineOptions, EngineState, EngineTrack, KeyValueStore, Progress,
};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<String>,
    pub queue: Vec<EngineTrack>,
    pub position: f64,
    pub never_ready: bool,
    pub failing_setups: usize,
    pub fail_reset: bool,
    pub fail_add: bool,
    pub fail_play: bool,
    pub listeners: Vec<mpsc::Sender<EngineEvent>>,
}

/// Engine double that logs every call. `reset` and `add` log a start and an
/// end entry around an artificial delay so overlapping calls show up.
#[derive(Default)]
pub struct MockEngine {
    queue_latency: Duration,
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_latency(queue_latency: Duration) -> Self {
        Self {
            queue_latency,
            ..Self::default()
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position(&self) -> f64 {
        self.state().position
    }

    fn log(&self, call: String) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn setup(&self) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.calls.push("setup".to_string());
        if state.failing_setups > 0 {
            state.failing_setups -= 1;
            return Err(anyhow!("setup rejected"));
        }
        Ok(())
    }

    async fn update_options(&self, _options: &EngineOptions) -> Result<()> {
        self.log("update_options".to_string());
        Ok(())
    }

    async fn set_app_killed_behavior(&self, _behavior: AppKilledBehavior) -> Result<()> {
        self.log("set_app_killed_behavior".to_string());
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.log("reset:start".to_string());
        tokio::time::sleep(self.queue_latency).await;
        let mut state = self.state();
        if state.fail_reset {
            return Err(anyhow!("reset rejected"));
        }
        state.queue.clear();
        state.position = 0.0;
        state.calls.push("reset:end".to_string());
        Ok(())
    }

    async fn add(&self, track: EngineTrack) -> Result<()> {
        self.log(format!("add:{}:start", track.id));
        tokio::time::sleep(self.queue_latency).await;
        let mut state = self.state();
        if state.fail_add {
            return Err(anyhow!("add rejected"));
        }
        state.calls.push(format!("add:{}:end", track.id));
        state.queue.push(track);
        Ok(())
    }

    async fn get_queue(&self) -> Result<Vec<EngineTrack>> {
        Ok(self.state().queue.clone())
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push("play".to_string());
        if state.fail_play {
            return Err(anyhow!("play rejected"));
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.log("pause".to_string());
        Ok(())
    }

    async fn seek_to(&self, position: f64) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("seek_to:{position}"));
        state.position = position;
        Ok(())
    }

    async fn set_rate(&self, rate: f64) -> Result<()> {
        self.log(format!("set_rate:{rate}"));
        Ok(())
    }

    async fn get_progress(&self) -> Result<Progress> {
        let state = self.state();
        if state.never_ready {
            return Ok(Progress::default());
        }
        let duration = state.queue.first().map(|t| t.duration).unwrap_or(0.0);
        Ok(Progress {
            position: state.position,
            duration,
            buffered: duration,
        })
    }

    async fn get_state(&self) -> Result<EngineState> {
        let state = self.state();
        Ok(if state.queue.is_empty() {
            EngineState::None
        } else if state.never_ready {
            EngineState::Loading
        } else {
            EngineState::Ready
        })
    }

    fn add_event_listener(&self, listener: mpsc::Sender<EngineEvent>) {
        self.state().listeners.push(listener);
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable"))
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("storage unavailable"))
    }
}
