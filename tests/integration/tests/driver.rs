//! Integration tests for the tokio session driver
//!
//! Time is paused, so interval ticks fire deterministically as the test
//! sleeps.

use avmedia::backend::{MediaBackend, MediaProfile, SimulatedBackend};
use avmedia::player::{BackendFactory, EventMessage, PlaybackState, PlayerEvent, PlayerRegistry};
use avmedia::renderer::ChannelTextureRegistry;
use avmedia::utils::SessionConfig;
use avmedia_integration_tests::positions;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn registry(engine: &SimulatedBackend) -> (PlayerRegistry, crossbeam_channel::Receiver<i64>) {
    let (textures, frames) = ChannelTextureRegistry::new();
    let factory: BackendFactory = {
        let engine = engine.clone();
        Box::new(move || -> Box<dyn MediaBackend> { Box::new(engine.clone()) })
    };
    let registry = PlayerRegistry::new(Arc::new(textures), factory, SessionConfig::default())
        .with_runtime(tokio::runtime::Handle::current());
    (registry, frames)
}

#[tokio::test(start_paused = true)]
async fn test_driven_session_reports_without_manual_pumping() {
    let engine = SimulatedBackend::new(MediaProfile::video(640, 360, Duration::from_secs(1)));
    let (mut registry, frames) = registry(&engine);
    let id = registry.create();
    let events = registry.listen(id).unwrap();

    registry
        .handle_json(&json!({"method": "open", "arguments": {"id": id, "value": "clip.mp4"}}).to_string())
        .unwrap();
    engine.make_ready();
    sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.session(id).unwrap().state(), PlaybackState::Ready);
    assert_eq!(frames.try_iter().count(), 1);

    registry.handle_json(&json!({"method": "play", "arguments": id}).to_string()).unwrap();
    for _ in 0..5 {
        engine.advance(Duration::from_millis(100));
        sleep(Duration::from_millis(20)).await;
    }

    let received: Vec<PlayerEvent> = events.try_iter().filter_map(EventMessage::event).collect();
    assert!(matches!(received.first(), Some(PlayerEvent::MediaInfo { duration: 1000, .. })));
    assert_eq!(positions(&received), vec![100, 200, 300, 400, 500]);
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_applied_by_driver() {
    let engine = SimulatedBackend::new(MediaProfile::audio_only(Duration::from_millis(300)))
        .with_auto_ready(true)
        .with_instant_seeks(true);
    let (mut registry, _frames) = registry(&engine);
    let id = registry.create();
    let events = registry.listen(id).unwrap();

    registry
        .handle_json(&json!({"method": "open", "arguments": {"id": id, "value": "song.m4a"}}).to_string())
        .unwrap();
    registry.handle_json(&json!({"method": "play", "arguments": id}).to_string()).unwrap();

    engine.advance(Duration::from_millis(500));
    sleep(Duration::from_millis(50)).await;

    let session = registry.session(id).unwrap();
    assert_eq!(session.state(), PlaybackState::Ready);
    let received: Vec<PlayerEvent> = events.try_iter().filter_map(EventMessage::event).collect();
    assert_eq!(received.last(), Some(&PlayerEvent::Finished));
    assert!(!session.snapshot().pump_armed);

    drop(session);
    registry.dispose(id);
    assert!(registry.is_empty());
}
