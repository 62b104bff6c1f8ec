//! Single-subscriber event emitter
//!
//! One subscriber at a time: `listen` replaces whoever was listening and
//! `cancel` clears it. While nobody listens, events are dropped rather than
//! queued, and a new subscriber never sees anything emitted before it
//! arrived.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use super::PlayerEvent;

/// Item delivered on a session's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum EventMessage {
    Event(PlayerEvent),

    /// Terminal signal sent when the session is disposed
    EndOfStream,
}

impl EventMessage {
    pub fn event(self) -> Option<PlayerEvent> {
        match self {
            EventMessage::Event(event) => Some(event),
            EventMessage::EndOfStream => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventEmitter {
    sink: Option<Sender<EventMessage>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscriber, replacing any previous one
    pub fn listen(&mut self) -> Receiver<EventMessage> {
        let (tx, rx) = unbounded();
        if self.sink.replace(tx).is_some() {
            debug!("Event subscriber replaced");
        }
        rx
    }

    pub fn cancel(&mut self) {
        self.sink = None;
    }

    pub fn is_listening(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit(&mut self, event: PlayerEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if sink.send(EventMessage::Event(event)).is_err() {
            debug!("Event subscriber went away");
            self.sink = None;
        }
    }

    /// Send the terminal signal and drop the subscriber
    pub fn end_of_stream(&mut self) {
        if let Some(sink) = self.sink.take() {
            let _ = sink.send(EventMessage::EndOfStream);
        }
    }
}
