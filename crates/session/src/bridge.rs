use crate::error::Result;
use crate::manager::PlaybackSessionManager;
use podplay_native::EngineEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Forwards engine events (lock screen, headset, progress ticks) to the
/// session. Failures are logged and dropped.
#[derive(Clone)]
pub struct RemoteControlBridge {
    session: Arc<PlaybackSessionManager>,
}

impl RemoteControlBridge {
    pub fn new(session: Arc<PlaybackSessionManager>) -> Self {
        Self { session }
    }

    /// Handles events until every sender is gone.
    pub async fn run(self, mut events: mpsc::Receiver<EngineEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        debug!("engine event channel closed");
    }

    pub async fn handle(&self, event: EngineEvent) {
        if let Err(err) = self.dispatch(&event).await {
            warn!(?event, error = %err, "remote control action failed");
        }
    }

    async fn dispatch(&self, event: &EngineEvent) -> Result<()> {
        match *event {
            EngineEvent::RemotePlay => self.session.play().await,
            EngineEvent::RemotePause | EngineEvent::RemoteStop => self.session.pause().await,
            EngineEvent::RemoteSeek { position } => self.session.seek_to(position).await,
            EngineEvent::RemotePrevious => self.session.seek_to(0.0).await,
            EngineEvent::RemoteNext => {
                let duration = self.session.snapshot().duration;
                if duration > 0.0 {
                    self.session.seek_to(duration).await
                } else {
                    debug!("ignoring remote next; duration unknown");
                    Ok(())
                }
            }
            EngineEvent::RemoteJumpForward { interval } if interval > 0.0 => {
                self.session.skip_forward(interval).await
            }
            EngineEvent::RemoteJumpForward { .. } => self.session.skip_forward_default().await,
            EngineEvent::RemoteJumpBackward { interval } if interval > 0.0 => {
                self.session.skip_backward(interval).await
            }
            EngineEvent::RemoteJumpBackward { .. } => self.session.skip_backward_default().await,
            EngineEvent::ProgressUpdated(progress) => {
                self.session.record_progress(progress);
                Ok(())
            }
            EngineEvent::QueueEnded => {
                self.session.mark_ended();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RemoteControlBridge;
    use crate::mock::MockEngine;
    use crate::{PlaybackSessionManager, SessionConfig};
    use podplay_core::{SessionPhase, Track};
    use podplay_native::{EngineEvent, MemoryStore};
    use std::sync::Arc;

    async fn loaded() -> (Arc<MockEngine>, Arc<PlaybackSessionManager>) {
        let engine = Arc::new(MockEngine::new());
        let session = Arc::new(PlaybackSessionManager::new(
            engine.clone(),
            Arc::new(MemoryStore::new()),
            SessionConfig::default(),
        ));
        session
            .load_track(Track::new("ep-1", "Episode 1", "https://cdn.example.com/1.mp3", 600.0))
            .await
            .unwrap();
        (engine, session)
    }

    #[tokio::test]
    async fn seek_events_map_to_positions() {
        let (engine, session) = loaded().await;
        let bridge = RemoteControlBridge::new(session.clone());

        bridge.handle(EngineEvent::RemoteSeek { position: 75.0 }).await;
        assert_eq!(engine.position(), 75.0);

        bridge.handle(EngineEvent::RemoteNext).await;
        assert_eq!(engine.position(), 600.0);

        bridge.handle(EngineEvent::RemotePrevious).await;
        assert_eq!(engine.position(), 0.0);

        bridge
            .handle(EngineEvent::RemoteJumpForward { interval: 10.0 })
            .await;
        assert_eq!(engine.position(), 10.0);

        bridge
            .handle(EngineEvent::RemoteJumpForward { interval: 0.0 })
            .await;
        assert_eq!(engine.position(), 40.0);

        bridge
            .handle(EngineEvent::RemoteJumpBackward { interval: 0.0 })
            .await;
        assert_eq!(engine.position(), 25.0);
    }

    #[tokio::test]
    async fn play_pause_and_stop_events() {
        let (engine, session) = loaded().await;
        let bridge = RemoteControlBridge::new(session.clone());

        bridge.handle(EngineEvent::RemotePlay).await;
        assert_eq!(session.phase(), SessionPhase::Playing);

        bridge.handle(EngineEvent::RemoteStop).await;
        assert_eq!(session.phase(), SessionPhase::Paused);

        bridge.handle(EngineEvent::RemotePlay).await;
        bridge.handle(EngineEvent::RemotePause).await;
        assert_eq!(engine.count("pause"), 2);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let engine = Arc::new(MockEngine::new());
        let session = Arc::new(PlaybackSessionManager::new(
            engine.clone(),
            Arc::new(MemoryStore::new()),
            SessionConfig::default(),
        ));
        let bridge = RemoteControlBridge::new(session.clone());

        bridge.handle(EngineEvent::RemotePlay).await;
        bridge.handle(EngineEvent::RemoteSeek { position: 3.0 }).await;

        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(engine.count("play"), 0);
        assert_eq!(engine.count("seek_to"), 0);
    }

    #[tokio::test]
    async fn run_drains_the_channel_registered_with_the_engine() {
        let (engine, session) = loaded().await;
        let events = session.subscribe_events(8);
        let listener = engine.state().listeners.pop().unwrap();

        listener
            .send(EngineEvent::RemoteSeek { position: 12.0 })
            .await
            .unwrap();
        listener.send(EngineEvent::RemotePlay).await.unwrap();
        drop(listener);

        RemoteControlBridge::new(session.clone()).run(events).await;

        assert_eq!(engine.position(), 12.0);
        assert!(session.snapshot().is_playing);
    }
}
