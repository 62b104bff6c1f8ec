//! Backend adapter module for AVMedia
//!
//! The media engine that actually opens, demuxes and decodes a source is
//! opaque to the playback core. This module defines the interface the core
//! drives it through: item replacement, status and timing queries, rate and
//! volume control, exact seeks with completion, loaded time ranges, a
//! frame-output object for the display-synchronized pump, and push-style
//! property notifications.

mod notify;
mod simulated;
mod source;

pub use notify::{BackendNotification, Envelope, Notifier, ObservedProperty, ObserverTable, SeekCompletion, SeekReason};
pub use simulated::{MediaProfile, SimulatedBackend};
pub use source::MediaSource;

use crate::utils::error::Result;
use std::time::{Duration, Instant};

/// Backend trait defining the interface to the media engine
pub trait MediaBackend: Send {
    /// Replace the current media item
    ///
    /// `Some` begins loading asynchronously; readiness or failure is reported
    /// later through the `Status` observer. `None` releases the current item.
    fn replace_item(&mut self, source: Option<&MediaSource>);

    /// Status of the current item
    fn status(&self) -> ItemStatus;

    /// Diagnostic message of the current item's failure, if any
    fn error(&self) -> Option<String>;

    /// Presentation size of the current item once ready
    ///
    /// Zero in either dimension means the item carries no video.
    fn presentation_size(&self) -> (u32, u32);

    /// Duration of the current item, `None` while unknown or indefinite
    fn duration(&self) -> Option<Duration>;

    /// Current playback time of the current item
    fn current_time(&self) -> Duration;

    /// Active playback rate, zero while paused
    fn rate(&self) -> f32;

    /// Set the active playback rate, starting playback when positive
    fn set_rate(&mut self, rate: f32);

    /// Pause playback
    fn pause(&mut self) {
        self.set_rate(0.0);
    }

    /// Set output volume (0.0 to 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Seek the current item
    ///
    /// The backend seeks asynchronously and reports through `completion`.
    fn seek(&mut self, target: Duration, tolerance: SeekTolerance, completion: SeekCompletion);

    /// Loaded time ranges of the current item, disjoint and unordered
    fn loaded_time_ranges(&self) -> Vec<TimeRange>;

    /// Register a notifier for an observed property, replacing any previous one
    fn add_observer(&mut self, property: ObservedProperty, notifier: Notifier);

    /// Remove the notifier for an observed property
    fn remove_observer(&mut self, property: ObservedProperty);

    /// Attach a video frame output to the current item
    fn attach_output(&mut self) -> Result<Box<dyn FrameOutput>>;

    /// Detach the frame output from the current item
    fn detach_output(&mut self);
}

/// Video frame output attached to a backend item
pub trait FrameOutput: Send {
    /// Translate a host clock instant into the item's own timeline
    fn item_time_for_host_time(&self, host_time: Instant) -> Duration;

    /// Whether a frame not yet copied exists for the given item time
    fn has_new_pixel_buffer(&self, item_time: Duration) -> bool;

    /// Copy out the frame for the given item time
    fn copy_pixel_buffer(&mut self, item_time: Duration) -> Option<PixelBuffer>;
}

/// Item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemStatus {
    /// Still loading, or no item
    #[default]
    Unknown,

    /// Ready to play
    ReadyToPlay,

    /// Loading failed; see `MediaBackend::error`
    Failed,
}

/// Time control status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControlStatus {
    #[default]
    Paused,
    WaitingToPlayAtSpecifiedRate,
    Playing,
}

/// Seek tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTolerance {
    /// Land on the requested time exactly
    Exact,

    /// Let the backend pick a nearby keyframe
    Default,
}

/// A loaded time range in the item's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Duration,
    pub duration: Duration,
}

impl TimeRange {
    pub fn new(start: Duration, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// End of the range
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    /// Whether `time` lies within the range, both ends inclusive
    pub fn contains(&self, time: Duration) -> bool {
        self.start <= time && self.end() >= time
    }
}

/// Decoded video frame handed to the renderer
///
/// Ownership moves to the caller of `take_frame`; dropping it releases the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Bytes per row
    pub stride: usize,

    /// Item time the frame was copied for
    pub item_time: Duration,

    /// BGRA pixel data
    pub data: Vec<u8>,
}
