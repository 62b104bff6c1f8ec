//! Playback session module for AVMedia
//!
//! This module holds the playback core: the session state machine, the
//! display-synchronized frame pump, the position and buffered-range
//! tracker, the single-subscriber event emitter, plus the registry that
//! multiplexes many sessions and the tokio driver that feeds them timer
//! ticks and backend notifications.

mod controller;
mod driver;
mod events;
mod frame_pump;
mod registry;
mod tracker;

pub use controller::{Session, SessionSnapshot};
pub use driver::SessionDriver;
pub use events::{EventEmitter, EventMessage};
pub use frame_pump::{FramePump, PumpStats};
pub use registry::{BackendFactory, MethodCall, PlayerRegistry};
pub use tracker::PositionTracker;

use serde::{Deserialize, Serialize};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No source
    #[default]
    Idle,

    /// Source handed to the backend, readiness pending
    Opening,

    /// Ready but not advancing
    Ready,

    /// Playing at the configured speed
    Playing,
}

/// Event pushed to the presentation layer
///
/// Times are whole milliseconds. The serialized form carries an `event` tag
/// (`mediaInfo`, `position`, `bufferChange`, `loading`, `seekEnd`,
/// `finished`, `error`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Source became ready
    MediaInfo {
        duration: u64,
        width: u32,
        height: u32,
        source: String,
    },

    /// Playback position changed
    Position { value: u64 },

    /// Loaded range around the position grew or moved
    BufferChange { begin: u64, end: u64 },

    /// Playback stalled waiting for data, or resumed
    Loading { value: bool },

    /// A requested seek completed
    SeekEnd,

    /// Playback reached the end of the source
    Finished,

    /// Open or decode failure
    Error {
        #[serde(rename = "value")]
        message: String,
    },
}

impl PlayerEvent {
    /// Serialize to the wire representation
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
