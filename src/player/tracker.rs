//! Position and buffered-range tracking
//!
//! The tracker is the only writer of the session's position and buffered
//! end. Both are reported as events only when they change.

use log::trace;
use std::time::Duration;

use super::PlayerEvent;
use crate::backend::{TimeControlStatus, TimeRange};
use crate::utils::to_millis;

#[derive(Debug, Default)]
pub struct PositionTracker {
    /// Last emitted playback position
    position: Duration,

    /// End of the loaded range containing the position, zero when unknown
    buffered_end: Duration,

    /// Whether the periodic sampler is armed
    sampling: bool,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn buffered_end(&self) -> Duration {
        self.buffered_end
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Arm the periodic sampler; returns false if it already was
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.sampling, true)
    }

    pub fn disarm(&mut self) {
        self.sampling = false;
    }

    /// Record a sampled playback time
    ///
    /// Samples are compared at the millisecond resolution events carry, so
    /// two samples within the same millisecond emit at most once.
    pub fn sample(&mut self, time: Duration) -> Option<PlayerEvent> {
        let value = to_millis(time);
        if value == to_millis(self.position) {
            trace!("Position {:?} unchanged", time);
            return None;
        }
        self.position = time;
        Some(PlayerEvent::Position { value })
    }

    /// Scan loaded ranges for the one containing `current`
    ///
    /// Ranges that do not contain the current time are ignored.
    pub fn on_loaded_ranges(&mut self, current: Duration, ranges: &[TimeRange]) -> Option<PlayerEvent> {
        let range = ranges.iter().find(|range| range.contains(current))?;
        let end = range.end();
        if end == self.buffered_end {
            return None;
        }
        self.buffered_end = end;
        Some(PlayerEvent::BufferChange {
            begin: to_millis(current),
            end: to_millis(end),
        })
    }

    /// Edge-triggered stall signal from a time control status transition
    pub fn loading_transition(old: TimeControlStatus, new: TimeControlStatus) -> Option<PlayerEvent> {
        let waiting = TimeControlStatus::WaitingToPlayAtSpecifiedRate;
        if old == new || (old != waiting && new != waiting) {
            return None;
        }
        Some(PlayerEvent::Loading {
            value: new == waiting,
        })
    }

    pub fn reset_buffer(&mut self) {
        self.buffered_end = Duration::ZERO;
    }

    /// Zero position and buffered end without emitting anything
    pub fn reset(&mut self) {
        self.position = Duration::ZERO;
        self.buffered_end = Duration::ZERO;
    }
}
