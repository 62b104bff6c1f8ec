//! AVMedia - a playback session engine
//!
//! A session drives an opaque media backend through open, close, play,
//! pause, seek, volume, speed and loop commands, hands decoded frames to a
//! renderer once per display refresh, and reports what happened on a
//! structured event stream.

pub mod backend;
pub mod player;
pub mod renderer;
pub mod utils;

pub use backend::{MediaBackend, MediaProfile, MediaSource, SimulatedBackend};
pub use player::{EventMessage, MethodCall, PlaybackState, PlayerEvent, PlayerRegistry, Session, SessionDriver};
pub use renderer::{ChannelTextureRegistry, TextureRegistry};
pub use utils::{AvMediaError, Config, Result, SessionConfig};
