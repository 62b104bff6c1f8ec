//! Session controller implementation for AVMedia
//!
//! A `Session` owns one backend and drives it through the
//! Idle → Opening → Ready ⇄ Playing state machine. Three independently
//! timed sources feed it: the position sampler tick, the display refresh
//! tick, and backend notifications. All of them, and every command, go
//! through the same `parking_lot::Mutex` around `SessionCore`.
//!
//! Backend notifications are never applied from the backend's own context.
//! They queue up in the session inbox stamped with the epoch current when
//! their observer or seek was registered, and are applied in order by
//! whoever next takes the lock, before that caller does its own work. A
//! pending end-of-stream or failure therefore always lands before a command
//! issued in the same instant. `close()` bumps the epoch, so anything
//! issued on behalf of a retired source is discarded on arrival.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use super::events::{EventEmitter, EventMessage};
use super::frame_pump::{FramePump, PumpStats};
use super::tracker::PositionTracker;
use super::{PlaybackState, PlayerEvent};
use crate::backend::{
    BackendNotification, Envelope, ItemStatus, MediaBackend, MediaSource, Notifier,
    ObservedProperty, PixelBuffer, SeekCompletion, SeekReason, SeekTolerance, TimeControlStatus,
};
use crate::renderer::TextureRegistry;
use crate::utils::config::SessionConfig;
use crate::utils::error::{AvMediaError, Result};
use crate::utils::{from_millis, to_millis};

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub source: Option<String>,
    pub position: Duration,
    pub buffered_end: Duration,
    pub volume: f32,
    pub speed: f32,
    pub looping: bool,
    pub pending_frame: Option<Duration>,
    pub sampling: bool,
    pub pump_armed: bool,
    pub epoch: u64,
}

/// One playable media session
pub struct Session {
    id: i64,
    core: Mutex<SessionCore>,
    inbox: Receiver<Envelope>,
    wake: Arc<Notify>,
    textures: Arc<dyn TextureRegistry>,
}

struct SessionCore {
    backend: Box<dyn MediaBackend>,
    state: PlaybackState,
    source: Option<String>,
    epoch: u64,
    volume: f32,
    speed: f32,
    looping: bool,
    tracker: PositionTracker,
    pump: FramePump,
    emitter: EventEmitter,
    inbox: Sender<Envelope>,
    wake: Arc<Notify>,
    disposed: bool,
}

impl Session {
    /// Create a session and register its texture surface
    ///
    /// The session id is the surface id handed out by `textures`.
    pub fn new(backend: Box<dyn MediaBackend>, textures: Arc<dyn TextureRegistry>, config: &SessionConfig) -> Self {
        let id = textures.register_texture();
        let (inbox_tx, inbox) = unbounded();
        let wake = Arc::new(Notify::new());
        info!("Created session {}", id);

        Self {
            id,
            core: Mutex::new(SessionCore {
                backend,
                state: PlaybackState::Idle,
                source: None,
                epoch: 0,
                volume: config.default_volume,
                speed: config.default_speed,
                looping: config.default_looping,
                tracker: PositionTracker::new(),
                pump: FramePump::new(),
                emitter: EventEmitter::new(),
                inbox: inbox_tx,
                wake: Arc::clone(&wake),
                disposed: false,
            }),
            inbox,
            wake,
            textures,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Lock the core after applying every notification already in the inbox
    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        let mut core = self.core.lock();
        while let Ok(envelope) = self.inbox.try_recv() {
            core.handle_envelope(envelope);
        }
        core
    }

    /// Apply pending backend notifications
    pub fn process_notifications(&self) {
        drop(self.lock());
    }

    /// Signalled whenever a backend notification lands in the inbox
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Subscribe to the event stream, replacing any previous subscriber
    pub fn listen(&self) -> Receiver<EventMessage> {
        self.lock().emitter.listen()
    }

    /// Drop the current subscriber
    pub fn cancel(&self) {
        self.lock().emitter.cancel();
    }

    /// Open a new source, closing the current one first
    ///
    /// A malformed locator is reported as an `Error` event and leaves the
    /// session untouched. Readiness arrives later as `MediaInfo`.
    pub fn open(&self, locator: &str) -> Result<()> {
        let mut core = self.lock();
        if core.disposed {
            return Err(AvMediaError::NotFound(self.id));
        }
        core.open(locator)
    }

    /// Tear down the current source; safe to call in any state
    pub fn close(&self) {
        self.lock().close();
    }

    pub fn play(&self) {
        self.lock().play();
    }

    pub fn pause(&self) {
        self.lock().pause();
    }

    /// Seek to a position in milliseconds; completion is reported as `SeekEnd`
    pub fn seek_to(&self, position_millis: f64) -> Result<()> {
        let target = from_millis(position_millis)
            .ok_or_else(|| AvMediaError::InvalidInput(format!("Invalid seek position {}", position_millis)))?;
        self.lock().seek_to(target);
        Ok(())
    }

    /// Set the volume (0.0 to 1.0); applies to the backend immediately
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        if !volume.is_finite() {
            return Err(AvMediaError::InvalidInput(format!("Invalid volume {}", volume)));
        }
        self.lock().set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    /// Set the playback speed; only forwarded to the backend while it advances
    pub fn set_speed(&self, speed: f32) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(AvMediaError::InvalidInput(format!("Speed must be positive, got {}", speed)));
        }
        self.lock().set_speed(speed);
        Ok(())
    }

    pub fn set_looping(&self, looping: bool) {
        self.lock().looping = looping;
    }

    /// Position sampler tick
    pub fn on_position_tick(&self) {
        self.lock().on_position_tick();
    }

    /// Display refresh tick
    ///
    /// Marks at most one frame as pending and signals the texture surface.
    pub fn on_display_refresh(&self, host_time: Instant) {
        let marked = self.lock().pump.on_refresh(host_time);
        if marked {
            self.textures.frame_available(self.id);
        }
    }

    /// Hand the pending frame to the renderer, if there is one
    pub fn take_frame(&self) -> Option<PixelBuffer> {
        self.lock().pump.take_frame()
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let core = self.lock();
        SessionSnapshot {
            state: core.state,
            source: core.source.clone(),
            position: core.tracker.position(),
            buffered_end: core.tracker.buffered_end(),
            volume: core.volume,
            speed: core.speed,
            looping: core.looping,
            pending_frame: core.pump.pending(),
            sampling: core.tracker.is_sampling(),
            pump_armed: core.pump.is_armed(),
            epoch: core.epoch,
        }
    }

    pub fn pump_stats(&self) -> PumpStats {
        self.lock().pump.stats()
    }

    /// End the event stream, close and release the texture surface
    pub fn dispose(&self) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        core.emitter.end_of_stream();
        core.close();
        drop(core);

        self.textures.unregister_texture(self.id);
        info!("Disposed session {}", self.id);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl SessionCore {
    fn notifier(&self) -> Notifier {
        Notifier::new(self.epoch, self.inbox.clone(), Arc::clone(&self.wake))
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.emitter.emit(event);
    }

    fn open(&mut self, locator: &str) -> Result<()> {
        let source = match MediaSource::parse(locator) {
            Ok(source) => source,
            Err(e) => {
                warn!("Rejected source {:?}: {}", locator, e);
                self.emit(PlayerEvent::Error { message: e.to_string() });
                return Err(e);
            }
        };

        self.close();

        if source.is_remote() {
            info!("Opening remote source {}", source);
        } else {
            info!("Opening {}", source);
        }
        self.source = Some(locator.to_string());
        self.state = PlaybackState::Opening;

        let notifier = self.notifier();
        for property in ObservedProperty::ALL {
            self.backend.add_observer(property, notifier.clone());
        }
        self.backend.replace_item(Some(&source));
        Ok(())
    }

    fn close(&mut self) {
        self.epoch += 1;
        self.tracker.disarm();
        for property in ObservedProperty::ALL {
            self.backend.remove_observer(property);
        }
        self.backend.pause();

        if self.pump.disarm() {
            self.backend.detach_output();
        }

        let had_source = self.source.take().is_some();
        self.tracker.reset();
        if had_source {
            self.backend.replace_item(None);
            info!("Closed source");
        }
        self.state = PlaybackState::Idle;
    }

    fn play(&mut self) {
        if !matches!(self.state, PlaybackState::Ready | PlaybackState::Playing) {
            debug!("Ignoring play while {:?}", self.state);
            return;
        }
        self.state = PlaybackState::Playing;
        if self.tracker.arm() {
            debug!("Position sampling armed");
        }
        self.backend.set_rate(self.speed);
    }

    fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Ready;
            self.backend.pause();
        }
    }

    fn seek_to(&mut self, target: Duration) {
        debug!("Seeking to {:?}", target);
        let completion = SeekCompletion::new(SeekReason::User, self.notifier());
        self.backend.seek(target, SeekTolerance::Exact, completion);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.backend.set_volume(volume);
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        if self.backend.rate() > 0.0 {
            self.backend.set_rate(speed);
        }
    }

    fn on_position_tick(&mut self) {
        if !self.tracker.is_sampling() {
            return;
        }
        if self.backend.rate() == 0.0 || self.backend.error().is_some() {
            debug!("Position sampling disarmed");
            self.tracker.disarm();
        }
        self.sample_position();
    }

    fn sample_position(&mut self) {
        let now = self.backend.current_time();
        if let Some(event) = self.tracker.sample(now) {
            self.emit(event);
        }
    }

    fn handle_envelope(&mut self, envelope: Envelope) {
        if envelope.epoch != self.epoch {
            debug!(
                "Discarding {:?} from epoch {} (current {})",
                envelope.notification, envelope.epoch, self.epoch
            );
            return;
        }

        match envelope.notification {
            BackendNotification::StatusChanged => self.on_status_changed(),
            BackendNotification::TimeControlChanged { old, new } => self.on_time_control_changed(old, new),
            BackendNotification::LoadedRangesChanged => self.on_loaded_ranges_changed(),
            BackendNotification::PlayedToEnd => self.on_played_to_end(),
            BackendNotification::SeekCompleted { reason: SeekReason::User, finished } => {
                self.on_seek_completed(finished)
            }
            BackendNotification::SeekCompleted { reason: SeekReason::EndOfStream, finished } => {
                self.on_rewound(finished)
            }
        }
    }

    fn on_status_changed(&mut self) {
        match self.backend.status() {
            ItemStatus::ReadyToPlay => self.on_ready(),
            ItemStatus::Failed => {
                if self.state == PlaybackState::Idle {
                    return;
                }
                let message = self.backend.error().unwrap_or_else(|| "Unknown error".to_string());
                warn!("Backend failed: {}", message);
                self.emit(PlayerEvent::Error { message });
                self.close();
            }
            ItemStatus::Unknown => {}
        }
    }

    fn on_ready(&mut self) {
        if self.state != PlaybackState::Opening {
            debug!("Ignoring ready status while {:?}", self.state);
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };

        let (width, height) = self.backend.presentation_size();
        let duration = self.backend.duration().map(to_millis).unwrap_or(0);
        if width > 0 && height > 0 && duration > 0 {
            match self.backend.attach_output() {
                Ok(output) => self.pump.arm(output),
                Err(e) => warn!("No video output for {}: {}", source, e),
            }
        }
        self.backend.set_volume(self.volume);
        self.state = PlaybackState::Ready;

        info!("Ready: {} ({}x{}, {} ms)", source, width, height, duration);
        self.emit(PlayerEvent::MediaInfo {
            duration,
            width,
            height,
            source,
        });
    }

    fn on_time_control_changed(&mut self, old: TimeControlStatus, new: TimeControlStatus) {
        if let Some(event) = PositionTracker::loading_transition(old, new) {
            self.emit(event);
        }
    }

    fn on_loaded_ranges_changed(&mut self) {
        let current = self.backend.current_time();
        let ranges = self.backend.loaded_time_ranges();
        if let Some(event) = self.tracker.on_loaded_ranges(current, &ranges) {
            self.emit(event);
        }
    }

    fn on_played_to_end(&mut self) {
        info!("Played to end");
        let completion = SeekCompletion::new(SeekReason::EndOfStream, self.notifier());
        self.backend.seek(Duration::ZERO, SeekTolerance::Default, completion);
    }

    fn on_seek_completed(&mut self, finished: bool) {
        if !finished {
            debug!("Seek interrupted");
            return;
        }
        self.emit(PlayerEvent::SeekEnd);
        if !self.tracker.is_sampling() {
            self.sample_position();
        }
    }

    fn on_rewound(&mut self, finished: bool) {
        self.tracker.reset_buffer();
        if self.looping && self.state == PlaybackState::Playing {
            debug!("Looping (rewind finished: {})", finished);
            self.play();
            self.sample_position();
        } else {
            if self.state == PlaybackState::Playing {
                self.state = PlaybackState::Ready;
            }
            self.tracker.reset();
        }
        self.emit(PlayerEvent::Finished);
    }
}
