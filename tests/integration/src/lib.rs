//! Integration test utilities for AVMedia
//!
//! This module provides the shared fixture the integration tests drive:
//! a session wired to a scriptable simulated backend and a channel-backed
//! texture registry, plus helpers to drain its event stream.

use avmedia::backend::{MediaProfile, SimulatedBackend};
use avmedia::player::{EventMessage, PlayerEvent, Session};
use avmedia::renderer::ChannelTextureRegistry;
use avmedia::utils::SessionConfig;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// One session plus the handles a test needs to script it
pub struct TestFixture {
    pub session: Arc<Session>,
    pub backend: SimulatedBackend,
    pub textures: Arc<ChannelTextureRegistry>,
    pub events: Receiver<EventMessage>,
    pub frames: Receiver<i64>,
}

impl TestFixture {
    /// Session over a 1920x1080, 10 second source
    pub fn new() -> Self {
        Self::with_profile(MediaProfile::video(1920, 1080, Duration::from_millis(10_000)))
    }

    pub fn with_profile(profile: MediaProfile) -> Self {
        Self::with_config(profile, SessionConfig::default())
    }

    pub fn with_config(profile: MediaProfile, config: SessionConfig) -> Self {
        let backend = SimulatedBackend::new(profile);
        let (textures, frames) = ChannelTextureRegistry::new();
        let textures = Arc::new(textures);
        let session = Arc::new(Session::new(Box::new(backend.clone()), textures.clone(), &config));
        let events = session.listen();

        Self {
            session,
            backend,
            textures,
            events,
            frames,
        }
    }

    /// Apply pending notifications and collect every event emitted so far
    pub fn drain(&self) -> Vec<PlayerEvent> {
        self.session.process_notifications();
        self.events.try_iter().filter_map(EventMessage::event).collect()
    }

    /// Open a source and let the backend report it ready
    pub fn open_ready(&self, locator: &str) -> Vec<PlayerEvent> {
        self.session.open(locator).expect("open should accept the locator");
        self.backend.make_ready();
        self.drain()
    }

    /// Play for `elapsed` media time, sampling the position once at the end
    pub fn play_for(&self, elapsed: Duration) {
        self.backend.advance(elapsed);
        self.session.on_position_tick();
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Position values in an event list
pub fn positions(events: &[PlayerEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::Position { value } => Some(*value),
            _ => None,
        })
        .collect()
}
