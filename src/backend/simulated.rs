//! Deterministic in-process backend
//!
//! `SimulatedBackend` stands in for a real media engine. It keeps a media
//! clock that only moves when [`SimulatedBackend::advance`] is called, turns
//! readiness, failure, buffering and seeks into observer notifications, and
//! produces synthetic frames at the profile's frame rate. The handle is
//! cheap to clone: one clone goes into the session, the other stays with the
//! caller to script the engine.

use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{
    BackendNotification, FrameOutput, ItemStatus, MediaBackend, MediaSource, Notifier,
    ObservedProperty, ObserverTable, PixelBuffer, SeekCompletion, SeekTolerance,
    TimeControlStatus, TimeRange,
};
use crate::utils::error::{AvMediaError, Result};

/// What the simulated engine reports for any item it loads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaProfile {
    /// Presentation width, zero for audio-only media
    pub width: u32,

    /// Presentation height, zero for audio-only media
    pub height: u32,

    /// Item duration, `None` for indefinite streams
    pub duration: Option<Duration>,

    /// Frames per second of the synthetic video
    pub fps: u32,
}

impl MediaProfile {
    pub fn video(width: u32, height: u32, duration: Duration) -> Self {
        Self {
            width,
            height,
            duration: Some(duration),
            fps: 30,
        }
    }

    pub fn audio_only(duration: Duration) -> Self {
        Self {
            width: 0,
            height: 0,
            duration: Some(duration),
            fps: 0,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    fn has_video(&self) -> bool {
        self.width > 0 && self.height > 0 && self.fps > 0
    }

    fn frame_index(&self, item_time: Duration) -> u64 {
        (item_time.as_secs_f64() * self.fps as f64).floor() as u64
    }
}

impl Default for MediaProfile {
    fn default() -> Self {
        Self::video(1920, 1080, Duration::from_secs(10))
    }
}

struct SimState {
    profile: MediaProfile,
    item: Option<String>,
    status: ItemStatus,
    error: Option<String>,
    time: Duration,
    rate: f32,
    volume: f32,
    waiting: bool,
    loaded: Vec<TimeRange>,
    observers: ObserverTable,
    pending_seeks: Vec<(Duration, SeekCompletion)>,
    auto_ready: bool,
    instant_seeks: bool,
    output_attached: bool,
    last_copied_frame: Option<u64>,
}

impl SimState {
    fn time_control_status(&self) -> TimeControlStatus {
        if self.rate <= 0.0 {
            TimeControlStatus::Paused
        } else if self.waiting {
            TimeControlStatus::WaitingToPlayAtSpecifiedRate
        } else {
            TimeControlStatus::Playing
        }
    }

    fn apply_rate(&mut self, rate: f32) {
        let old = self.time_control_status();
        self.rate = rate;
        self.notify_time_control(old);
    }

    fn notify_time_control(&self, old: TimeControlStatus) {
        let new = self.time_control_status();
        if new != old {
            self.observers.notify(
                ObservedProperty::TimeControlStatus,
                BackendNotification::TimeControlChanged { old, new },
            );
        }
    }

    fn clamp_to_item(&self, target: Duration) -> Duration {
        match self.profile.duration {
            Some(duration) => target.min(duration),
            None => target,
        }
    }
}

/// Scriptable backend with a manually advanced clock
#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new(profile: MediaProfile) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                profile,
                item: None,
                status: ItemStatus::Unknown,
                error: None,
                time: Duration::ZERO,
                rate: 0.0,
                volume: 1.0,
                waiting: false,
                loaded: Vec::new(),
                observers: ObserverTable::new(),
                pending_seeks: Vec::new(),
                auto_ready: false,
                instant_seeks: false,
                output_attached: false,
                last_copied_frame: None,
            })),
        }
    }

    /// Report readiness as soon as an item is loaded
    pub fn with_auto_ready(self, enabled: bool) -> Self {
        self.state.lock().auto_ready = enabled;
        self
    }

    /// Complete seeks as soon as they are issued
    pub fn with_instant_seeks(self, enabled: bool) -> Self {
        self.state.lock().instant_seeks = enabled;
        self
    }

    /// Change the profile reported for items loaded from now on
    pub fn set_profile(&self, profile: MediaProfile) {
        self.state.lock().profile = profile;
    }

    /// Finish loading the current item successfully
    pub fn make_ready(&self) {
        let mut state = self.state.lock();
        if state.item.is_none() {
            return;
        }
        state.status = ItemStatus::ReadyToPlay;
        state.observers.notify(ObservedProperty::Status, BackendNotification::StatusChanged);
    }

    /// Fail the current item with a diagnostic; `None` reports no diagnostic
    pub fn fail(&self, message: Option<&str>) {
        let mut state = self.state.lock();
        if state.item.is_none() {
            return;
        }
        state.status = ItemStatus::Failed;
        state.error = message.map(str::to_string);
        state.observers.notify(ObservedProperty::Status, BackendNotification::StatusChanged);
    }

    /// Move the media clock forward by `elapsed` wall time at the current rate
    ///
    /// Reaching the end of the item stops playback and posts `PlayedToEnd`.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        if state.status != ItemStatus::ReadyToPlay || state.rate <= 0.0 || state.waiting {
            return;
        }

        let step = if state.rate == 1.0 {
            elapsed
        } else {
            elapsed.mul_f64(state.rate as f64)
        };
        state.time += step;
        if let Some(duration) = state.profile.duration {
            if state.time >= duration {
                state.time = duration;
                state.apply_rate(0.0);
                debug!("Simulated item played to end at {:?}", duration);
                state.observers.notify(ObservedProperty::PlayedToEnd, BackendNotification::PlayedToEnd);
            }
        }
    }

    /// Complete every outstanding seek
    pub fn complete_seeks(&self) {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending_seeks);
        for (target, completion) in pending {
            state.time = target;
            completion.complete(true);
        }
    }

    /// Replace the loaded time ranges and notify observers
    pub fn set_loaded_ranges(&self, ranges: Vec<TimeRange>) {
        let mut state = self.state.lock();
        state.loaded = ranges;
        state.observers.notify(ObservedProperty::LoadedTimeRanges, BackendNotification::LoadedRangesChanged);
    }

    /// Enter or leave the "waiting to play at rate" stall
    pub fn set_waiting(&self, waiting: bool) {
        let mut state = self.state.lock();
        let old = state.time_control_status();
        state.waiting = waiting;
        state.notify_time_control(old);
    }

    pub fn position(&self) -> Duration {
        self.state.lock().time
    }

    pub fn playback_rate(&self) -> f32 {
        self.state.lock().rate
    }

    pub fn output_volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// Locator of the loaded item
    pub fn item(&self) -> Option<String> {
        self.state.lock().item.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    pub fn has_output(&self) -> bool {
        self.state.lock().output_attached
    }

    pub fn pending_seek_count(&self) -> usize {
        self.state.lock().pending_seeks.len()
    }
}

impl MediaBackend for SimulatedBackend {
    fn replace_item(&mut self, source: Option<&MediaSource>) {
        let mut state = self.state.lock();
        for (_, completion) in std::mem::take(&mut state.pending_seeks) {
            completion.complete(false);
        }

        state.item = source.map(|s| s.to_string());
        state.status = ItemStatus::Unknown;
        state.error = None;
        state.time = Duration::ZERO;
        state.waiting = false;
        state.loaded.clear();
        state.output_attached = false;
        state.last_copied_frame = None;

        if state.item.is_none() {
            state.rate = 0.0;
        } else if state.auto_ready {
            state.status = ItemStatus::ReadyToPlay;
            state.observers.notify(ObservedProperty::Status, BackendNotification::StatusChanged);
        }
    }

    fn status(&self) -> ItemStatus {
        self.state.lock().status
    }

    fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    fn presentation_size(&self) -> (u32, u32) {
        let state = self.state.lock();
        match state.status {
            ItemStatus::ReadyToPlay => (state.profile.width, state.profile.height),
            _ => (0, 0),
        }
    }

    fn duration(&self) -> Option<Duration> {
        let state = self.state.lock();
        match state.status {
            ItemStatus::ReadyToPlay => state.profile.duration,
            _ => None,
        }
    }

    fn current_time(&self) -> Duration {
        self.state.lock().time
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.lock().apply_rate(rate.max(0.0));
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn seek(&mut self, target: Duration, _tolerance: SeekTolerance, completion: SeekCompletion) {
        let mut state = self.state.lock();
        let target = state.clamp_to_item(target);

        if state.instant_seeks {
            state.time = target;
            completion.complete(true);
            return;
        }

        // A new seek interrupts the ones still in flight
        for (_, interrupted) in std::mem::take(&mut state.pending_seeks) {
            interrupted.complete(false);
        }
        state.pending_seeks.push((target, completion));
    }

    fn loaded_time_ranges(&self) -> Vec<TimeRange> {
        self.state.lock().loaded.clone()
    }

    fn add_observer(&mut self, property: ObservedProperty, notifier: Notifier) {
        self.state.lock().observers.insert(property, notifier);
    }

    fn remove_observer(&mut self, property: ObservedProperty) {
        self.state.lock().observers.remove(property);
    }

    fn attach_output(&mut self) -> Result<Box<dyn FrameOutput>> {
        let mut state = self.state.lock();
        if state.status != ItemStatus::ReadyToPlay {
            return Err(AvMediaError::backend_error("No ready item to attach a video output to"));
        }
        state.output_attached = true;
        state.last_copied_frame = None;
        Ok(Box::new(SimulatedOutput {
            state: Arc::clone(&self.state),
        }))
    }

    fn detach_output(&mut self) {
        let mut state = self.state.lock();
        state.output_attached = false;
        state.last_copied_frame = None;
    }
}

/// Frame output producing one synthetic BGRA frame per frame interval
struct SimulatedOutput {
    state: Arc<Mutex<SimState>>,
}

impl FrameOutput for SimulatedOutput {
    fn item_time_for_host_time(&self, _host_time: Instant) -> Duration {
        self.state.lock().time
    }

    fn has_new_pixel_buffer(&self, item_time: Duration) -> bool {
        let state = self.state.lock();
        state.output_attached
            && state.profile.has_video()
            && state.last_copied_frame != Some(state.profile.frame_index(item_time))
    }

    fn copy_pixel_buffer(&mut self, item_time: Duration) -> Option<PixelBuffer> {
        let mut state = self.state.lock();
        if !state.output_attached || !state.profile.has_video() {
            return None;
        }

        let index = state.profile.frame_index(item_time);
        state.last_copied_frame = Some(index);

        let (width, height) = (state.profile.width, state.profile.height);
        let stride = width as usize * 4;
        Some(PixelBuffer {
            width,
            height,
            stride,
            item_time,
            data: vec![(index % 256) as u8; stride * height as usize],
        })
    }
}
