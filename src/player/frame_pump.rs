//! Display-synchronized frame pump
//!
//! Each display refresh asks the attached frame output whether a new frame
//! exists at "now" on the item's timeline. If so, the item time is recorded
//! in a single pending slot and the renderer is told a frame is available.
//! The renderer then drains the slot exactly once through `take_frame`.
//! While a frame is pending, refresh ticks do nothing, so at most one frame
//! is ever in flight.

use log::{debug, trace};
use std::time::{Duration, Instant};

use crate::backend::{FrameOutput, PixelBuffer};

/// Frame delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Frames announced to the renderer
    pub frames_signalled: u64,

    /// Frames handed over by `take_frame`
    pub frames_taken: u64,

    /// `take_frame` calls that found nothing pending
    pub empty_takes: u64,
}

#[derive(Default)]
pub struct FramePump {
    output: Option<Box<dyn FrameOutput>>,
    pending: Option<Duration>,
    stats: PumpStats,
}

impl FramePump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the pump with a freshly attached frame output
    pub fn arm(&mut self, output: Box<dyn FrameOutput>) {
        debug!("Frame pump armed");
        self.output = Some(output);
        self.pending = None;
    }

    /// Drop the output and any pending marker; returns whether it was armed
    pub fn disarm(&mut self) -> bool {
        self.pending = None;
        let was_armed = self.output.take().is_some();
        if was_armed {
            debug!("Frame pump disarmed");
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.output.is_some()
    }

    /// Item time of the frame waiting to be taken
    pub fn pending(&self) -> Option<Duration> {
        self.pending
    }

    pub fn stats(&self) -> PumpStats {
        self.stats
    }

    /// Handle a display refresh; returns true when a new frame was marked
    pub fn on_refresh(&mut self, host_time: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let Some(output) = &self.output else {
            return false;
        };

        let item_time = output.item_time_for_host_time(host_time);
        if !output.has_new_pixel_buffer(item_time) {
            return false;
        }

        trace!("Frame ready at {:?}", item_time);
        self.pending = Some(item_time);
        self.stats.frames_signalled += 1;
        true
    }

    /// Hand the pending frame to the renderer
    ///
    /// The marker is cleared before the pixels are copied, so a second call
    /// returns `None` until the next refresh marks a new frame.
    pub fn take_frame(&mut self) -> Option<PixelBuffer> {
        let Some(item_time) = self.pending.take() else {
            self.stats.empty_takes += 1;
            return None;
        };

        let frame = self.output.as_mut()?.copy_pixel_buffer(item_time);
        if frame.is_some() {
            self.stats.frames_taken += 1;
        }
        frame
    }
}
