//! Integration tests for the session registry
//!
//! These tests verify the JSON method-call surface end to end:
//! - Session creation and surface registration
//! - Command dispatch and answers
//! - Error reporting for malformed and unknown calls
//! - Surface release on dispose

use avmedia::backend::{MediaBackend, MediaProfile, SimulatedBackend};
use avmedia::player::{BackendFactory, EventMessage, PlaybackState, PlayerEvent, PlayerRegistry};
use avmedia::renderer::TextureRegistry;
use avmedia::utils::{AvMediaError, SessionConfig};
use mockall::mock;
use mockall::predicate::eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

mock! {
    pub Textures {}

    impl TextureRegistry for Textures {
        fn register_texture(&self) -> i64;
        fn frame_available(&self, texture_id: i64);
        fn unregister_texture(&self, texture_id: i64);
    }
}

fn factory(engine: &SimulatedBackend) -> BackendFactory {
    let engine = engine.clone();
    Box::new(move || -> Box<dyn MediaBackend> { Box::new(engine.clone()) })
}

fn call(registry: &mut PlayerRegistry, value: Value) -> avmedia::Result<Value> {
    registry.handle_json(&value.to_string())
}

#[test]
fn test_surface_lifecycle_through_json() {
    let mut textures = MockTextures::new();
    textures.expect_register_texture().times(1).return_const(7i64);
    textures.expect_frame_available().with(eq(7)).times(1).return_const(());
    textures.expect_unregister_texture().with(eq(7)).times(1).return_const(());

    let engine = SimulatedBackend::new(MediaProfile::video(320, 240, Duration::from_secs(4))).with_auto_ready(true);
    let mut registry = PlayerRegistry::new(Arc::new(textures), factory(&engine), SessionConfig::default());

    assert_eq!(call(&mut registry, json!({"method": "create"})).unwrap(), json!(7));
    let events = registry.listen(7).unwrap();

    assert_eq!(
        call(&mut registry, json!({"method": "open", "arguments": {"id": 7, "value": "clip.mp4"}})).unwrap(),
        Value::Null
    );
    let session = registry.session(7).unwrap();
    session.process_notifications();
    session.on_display_refresh(Instant::now());
    session.on_display_refresh(Instant::now());
    assert!(session.take_frame().is_some());
    drop(session);

    call(&mut registry, json!({"method": "dispose", "arguments": 7})).unwrap();
    assert!(registry.is_empty());

    let messages: Vec<EventMessage> = events.try_iter().collect();
    assert!(matches!(messages.first(), Some(EventMessage::Event(PlayerEvent::MediaInfo { .. }))));
    assert_eq!(messages.last(), Some(&EventMessage::EndOfStream));
}

#[test]
fn test_transport_commands() {
    let (textures, _frames) = avmedia::ChannelTextureRegistry::new();
    let engine = SimulatedBackend::new(MediaProfile::video(320, 240, Duration::from_secs(4)))
        .with_auto_ready(true)
        .with_instant_seeks(true);
    let mut registry = PlayerRegistry::new(Arc::new(textures), factory(&engine), SessionConfig::default());

    let id = call(&mut registry, json!({"method": "create"})).unwrap().as_i64().unwrap();
    let events = registry.listen(id).unwrap();
    let session = registry.session(id).unwrap();

    for value in [
        json!({"method": "open", "arguments": {"id": id, "value": "https://example.com/clip.m3u8"}}),
        json!({"method": "setVolume", "arguments": {"id": id, "value": 0.4}}),
        json!({"method": "setSpeed", "arguments": {"id": id, "value": 1.5}}),
        json!({"method": "setLooping", "arguments": {"id": id, "value": true}}),
        json!({"method": "play", "arguments": id}),
    ] {
        assert_eq!(call(&mut registry, value).unwrap(), Value::Null);
    }

    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(engine.playback_rate(), 1.5);
    assert_eq!(engine.output_volume(), 0.4);
    assert!(session.snapshot().looping);

    call(&mut registry, json!({"method": "pause", "arguments": id})).unwrap();
    assert_eq!(session.state(), PlaybackState::Ready);
    // First sampler tick after the pause disarms it
    session.on_position_tick();

    call(&mut registry, json!({"method": "seekTo", "arguments": {"id": id, "value": 3000.0}})).unwrap();
    session.process_notifications();

    call(&mut registry, json!({"method": "close", "arguments": id})).unwrap();
    assert_eq!(session.state(), PlaybackState::Idle);

    let received: Vec<PlayerEvent> = events.try_iter().filter_map(EventMessage::event).collect();
    assert!(received.ends_with(&[PlayerEvent::SeekEnd, PlayerEvent::Position { value: 3000 }]));
}

#[test]
fn test_call_errors() {
    let (textures, _frames) = avmedia::ChannelTextureRegistry::new();
    let engine = SimulatedBackend::new(MediaProfile::default());
    let mut registry = PlayerRegistry::new(Arc::new(textures), factory(&engine), SessionConfig::default());

    assert!(matches!(
        call(&mut registry, json!({"method": "setFullscreen", "arguments": 1})),
        Err(AvMediaError::NotImplemented(_))
    ));
    assert!(matches!(
        call(&mut registry, json!({"method": "open", "arguments": {"id": 1}})),
        Err(AvMediaError::Json(_))
    ));

    // Well-formed calls for sessions that do not exist answer null
    assert_eq!(call(&mut registry, json!({"method": "play", "arguments": 99})).unwrap(), Value::Null);
    assert_eq!(call(&mut registry, json!({"method": "dispose", "arguments": 99})).unwrap(), Value::Null);
}

#[test]
fn test_sessions_are_independent() {
    let (textures, _frames) = avmedia::ChannelTextureRegistry::new();
    let factory: BackendFactory = Box::new(|| -> Box<dyn MediaBackend> {
        Box::new(SimulatedBackend::new(MediaProfile::default()).with_auto_ready(true))
    });
    let mut registry = PlayerRegistry::new(Arc::new(textures), factory, SessionConfig::default());

    let first = registry.create();
    let second = registry.create();
    registry.handle_json(&json!({"method": "open", "arguments": {"id": first, "value": "a.mp4"}}).to_string()).unwrap();
    registry.handle_json(&json!({"method": "play", "arguments": first}).to_string()).unwrap();

    assert_eq!(registry.session(first).unwrap().state(), PlaybackState::Playing);
    assert_eq!(registry.session(second).unwrap().state(), PlaybackState::Idle);

    registry.dispose(first);
    assert_eq!(registry.len(), 1);
    assert!(registry.session(first).is_none());
}
