//! Integration tests for the session lifecycle
//!
//! These tests drive a full session through the simulated backend:
//! - Open, readiness and failure
//! - Transport commands and position sampling
//! - End of stream with and without looping
//! - Frame delivery and teardown

use avmedia::backend::{MediaProfile, TimeRange};
use avmedia::player::{EventMessage, PlaybackState, PlayerEvent};
use avmedia::utils::{AvMediaError, Config, SessionConfig};
use avmedia_integration_tests::{positions, TestFixture};
use std::time::{Duration, Instant};

#[test]
fn test_open_reports_media_info_once() {
    let fixture = TestFixture::new();
    fixture.session.open("clip.mp4").unwrap();
    assert_eq!(fixture.session.state(), PlaybackState::Opening);

    fixture.backend.make_ready();
    // A duplicate ready notification must not produce a second MediaInfo
    fixture.backend.make_ready();

    assert_eq!(
        fixture.drain(),
        vec![PlayerEvent::MediaInfo {
            duration: 10_000,
            width: 1920,
            height: 1080,
            source: "clip.mp4".to_string(),
        }]
    );
    assert_eq!(fixture.session.state(), PlaybackState::Ready);
}

#[test]
fn test_malformed_locator_is_rejected_up_front() {
    let fixture = TestFixture::new();

    let result = fixture.session.open("http://exa mple.com/clip.mp4");
    assert!(matches!(result, Err(AvMediaError::InvalidSource(_))));
    assert!(matches!(fixture.drain().as_slice(), [PlayerEvent::Error { .. }]));
    assert_eq!(fixture.session.state(), PlaybackState::Idle);
    assert_eq!(fixture.backend.item(), None);
    assert_eq!(fixture.backend.observer_count(), 0);
}

#[test]
fn test_close_after_playback_returns_to_idle() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");
    fixture.session.play();
    fixture.play_for(Duration::from_millis(1200));
    fixture.backend.set_loaded_ranges(vec![TimeRange::new(Duration::ZERO, Duration::from_secs(3))]);
    fixture.session.on_display_refresh(Instant::now());
    fixture.drain();

    fixture.session.close();

    let snapshot = fixture.session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.position, Duration::ZERO);
    assert_eq!(snapshot.buffered_end, Duration::ZERO);
    assert_eq!(snapshot.pending_frame, None);
    assert!(!snapshot.sampling);
    assert!(!snapshot.pump_armed);
    assert_eq!(fixture.backend.observer_count(), 0);
    assert_eq!(fixture.backend.playback_rate(), 0.0);
    assert!(!fixture.backend.has_output());
}

#[test]
fn test_open_while_playing_replaces_source() {
    let fixture = TestFixture::new();
    fixture.open_ready("a.mp4");
    fixture.session.play();
    fixture.play_for(Duration::from_millis(300));
    fixture.drain();
    let epoch = fixture.session.snapshot().epoch;

    let events = fixture.open_ready("b.mp4");
    assert!(matches!(events.as_slice(), [PlayerEvent::MediaInfo { source, .. }] if source == "b.mp4"));

    let snapshot = fixture.session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Ready);
    assert_eq!(snapshot.position, Duration::ZERO);
    assert!(snapshot.epoch > epoch);
    assert_eq!(fixture.backend.item().as_deref(), Some("b.mp4"));
}

#[test]
fn test_positions_are_deduplicated() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");
    fixture.session.play();

    for _ in 0..3 {
        fixture.play_for(Duration::from_millis(100));
        fixture.session.on_position_tick();
    }

    assert_eq!(positions(&fixture.drain()), vec![100, 200, 300]);
}

#[test]
fn test_failure_while_playing() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");
    fixture.session.play();
    fixture.backend.fail(Some("Stream corrupted"));

    assert_eq!(fixture.drain(), vec![PlayerEvent::Error { message: "Stream corrupted".to_string() }]);
    assert_eq!(fixture.session.state(), PlaybackState::Idle);
    assert!(!fixture.session.snapshot().sampling);
}

#[test]
fn test_seek_while_paused_forces_one_position() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");

    fixture.session.seek_to(7250.0).unwrap();
    fixture.backend.complete_seeks();

    assert_eq!(fixture.drain(), vec![PlayerEvent::SeekEnd, PlayerEvent::Position { value: 7250 }]);
    assert!(!fixture.session.snapshot().sampling);
}

#[test]
fn test_interrupted_seek_reports_once() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");

    fixture.session.seek_to(1000.0).unwrap();
    fixture.session.seek_to(2000.0).unwrap();
    fixture.backend.complete_seeks();

    assert_eq!(fixture.drain(), vec![PlayerEvent::SeekEnd, PlayerEvent::Position { value: 2000 }]);
}

#[test]
fn test_seek_clamps_to_duration() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");

    fixture.session.seek_to(60_000.0).unwrap();
    fixture.backend.complete_seeks();
    assert_eq!(positions(&fixture.drain()), vec![10_000]);
}

#[test]
fn test_volume_immediate_speed_deferred() {
    let fixture = TestFixture::new();
    fixture.session.set_volume(0.25).unwrap();
    assert_eq!(fixture.backend.output_volume(), 0.25);

    fixture.open_ready("clip.mp4");
    fixture.session.set_speed(2.0).unwrap();
    assert_eq!(fixture.backend.playback_rate(), 0.0);

    fixture.session.play();
    assert_eq!(fixture.backend.playback_rate(), 2.0);
    fixture.play_for(Duration::from_millis(100));
    assert_eq!(positions(&fixture.drain()), vec![200]);
}

#[test]
fn test_volume_survives_reopen() {
    let fixture = TestFixture::new();
    fixture.open_ready("a.mp4");
    fixture.session.set_volume(0.3).unwrap();
    fixture.session.close();

    fixture.backend.set_profile(MediaProfile::video(640, 480, Duration::from_secs(2)));
    fixture.open_ready("b.mp4");

    assert_eq!(fixture.session.snapshot().volume, 0.3);
    assert_eq!(fixture.backend.output_volume(), 0.3);
}

#[test]
fn test_end_of_stream_loops() {
    let fixture = TestFixture::with_profile(MediaProfile::video(320, 240, Duration::from_secs(2)));
    fixture.open_ready("clip.mp4");
    fixture.session.set_looping(true);
    fixture.session.play();
    fixture.play_for(Duration::from_millis(1500));
    fixture.drain();

    fixture.play_for(Duration::from_millis(1500));
    fixture.backend.complete_seeks();

    let events = fixture.drain();
    assert_eq!(positions(&events), vec![2000, 0]);
    assert_eq!(events.last(), Some(&PlayerEvent::Finished));

    let snapshot = fixture.session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert!(snapshot.sampling);
    assert_eq!(fixture.backend.playback_rate(), 1.0);

    // Playback keeps going from the start
    fixture.play_for(Duration::from_millis(400));
    assert_eq!(positions(&fixture.drain()), vec![400]);
}

#[test]
fn test_end_of_stream_stops_without_loop() {
    let fixture = TestFixture::with_profile(MediaProfile::video(320, 240, Duration::from_secs(1)));
    fixture.open_ready("clip.mp4");
    fixture.session.play();
    fixture.play_for(Duration::from_millis(2000));
    fixture.backend.complete_seeks();

    let events = fixture.drain();
    assert_eq!(events.last(), Some(&PlayerEvent::Finished));
    assert_eq!(fixture.session.state(), PlaybackState::Ready);
    assert_eq!(fixture.backend.playback_rate(), 0.0);
    assert_eq!(fixture.session.snapshot().position, Duration::ZERO);
}

#[test]
fn test_single_pending_frame() {
    let fixture = TestFixture::with_profile(MediaProfile::video(320, 240, Duration::from_secs(5)).with_fps(10));
    fixture.open_ready("clip.mp4");
    let now = Instant::now();

    fixture.session.on_display_refresh(now);
    fixture.session.play();
    fixture.backend.advance(Duration::from_millis(150));
    fixture.session.on_display_refresh(now);
    assert_eq!(fixture.frames.try_iter().count(), 1);

    let frame = fixture.session.take_frame().unwrap();
    assert_eq!(frame.item_time, Duration::ZERO);
    assert_eq!(frame.data.len(), frame.stride * frame.height as usize);
    assert!(fixture.session.take_frame().is_none());

    fixture.session.on_display_refresh(now);
    let frame = fixture.session.take_frame().unwrap();
    assert_eq!(frame.item_time, Duration::from_millis(150));
}

#[test]
fn test_dispose_releases_surface() {
    let fixture = TestFixture::new();
    fixture.open_ready("clip.mp4");
    assert_eq!(fixture.textures.live_count(), 1);

    fixture.session.dispose();
    assert_eq!(fixture.textures.live_count(), 0);
    assert_eq!(fixture.events.try_iter().last(), Some(EventMessage::EndOfStream));
    assert_eq!(fixture.backend.item(), None);
}

#[test]
fn test_defaults_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[session]\ndefault_volume = 0.5\ndefault_looping = true\n").unwrap();
    let config = Config::load_from(&path).unwrap();

    let fixture = TestFixture::with_config(MediaProfile::default(), config.session);
    let snapshot = fixture.session.snapshot();
    assert_eq!(snapshot.volume, 0.5);
    assert!(snapshot.looping);
    assert_eq!(SessionConfig::default().default_volume, 1.0);
}
