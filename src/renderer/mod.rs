//! Texture surface interface for AVMedia
//!
//! Drawing a delivered pixel buffer to screen is the presentation layer's
//! job. The playback core only needs a registration that hands out an
//! opaque surface id and a "frame available" signal the renderer consumes
//! at its own pull cadence, by calling `Session::take_frame`.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

/// Texture registry trait implemented by the compositing system
pub trait TextureRegistry: Send + Sync {
    /// Register a new surface and return its id
    fn register_texture(&self) -> i64;

    /// Signal that a new frame can be pulled for the surface
    ///
    /// Called without any session lock held; implementations may pull the
    /// frame synchronously.
    fn frame_available(&self, texture_id: i64);

    /// Release a surface
    fn unregister_texture(&self, texture_id: i64);
}

/// Texture registry forwarding "frame available" signals over a channel
///
/// A render loop receives surface ids from the paired receiver and pulls
/// frames from the matching session.
pub struct ChannelTextureRegistry {
    next_id: AtomicI64,
    live: Mutex<HashSet<i64>>,
    frames: Sender<i64>,
}

impl ChannelTextureRegistry {
    pub fn new() -> (Self, Receiver<i64>) {
        let (frames, rx) = unbounded();
        let registry = Self {
            next_id: AtomicI64::new(1),
            live: Mutex::new(HashSet::new()),
            frames,
        };
        (registry, rx)
    }

    /// Number of registered surfaces
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl TextureRegistry for ChannelTextureRegistry {
    fn register_texture(&self) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live.lock().insert(id);
        debug!("Registered texture {}", id);
        id
    }

    fn frame_available(&self, texture_id: i64) {
        if self.live.lock().contains(&texture_id) {
            let _ = self.frames.send(texture_id);
        }
    }

    fn unregister_texture(&self, texture_id: i64) {
        self.live.lock().remove(&texture_id);
        debug!("Unregistered texture {}", texture_id);
    }
}
