//! Backend notifications
//!
//! Backends never call into the session directly. Every property change,
//! end-of-stream and seek completion is posted as an [`Envelope`] into the
//! session's inbox, stamped with the epoch that was current when the
//! observer or seek was registered. The session applies envelopes under its
//! own lock and discards those whose epoch has been retired by `close()`.

use crossbeam_channel::Sender;
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

use super::TimeControlStatus;

/// Properties a session can observe on its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedProperty {
    /// Item status (ready/failed)
    Status,

    /// Time control status (playing/paused/waiting)
    TimeControlStatus,

    /// Loaded time ranges of the current item
    LoadedTimeRanges,

    /// Current item played to its end
    PlayedToEnd,
}

impl ObservedProperty {
    pub const ALL: [ObservedProperty; 4] = [
        ObservedProperty::Status,
        ObservedProperty::TimeControlStatus,
        ObservedProperty::LoadedTimeRanges,
        ObservedProperty::PlayedToEnd,
    ];
}

/// Why a seek was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekReason {
    /// Requested through `seek_to`
    User,

    /// Rewind issued by the end-of-stream handler
    EndOfStream,
}

/// Notification posted by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendNotification {
    StatusChanged,
    TimeControlChanged { old: TimeControlStatus, new: TimeControlStatus },
    LoadedRangesChanged,
    PlayedToEnd,
    SeekCompleted { reason: SeekReason, finished: bool },
}

/// A notification tagged with the epoch it was issued under
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub epoch: u64,
    pub notification: BackendNotification,
}

/// Handle a backend uses to post notifications into a session inbox
#[derive(Clone)]
pub struct Notifier {
    epoch: u64,
    inbox: Sender<Envelope>,
    wake: Arc<Notify>,
}

impl Notifier {
    pub fn new(epoch: u64, inbox: Sender<Envelope>, wake: Arc<Notify>) -> Self {
        Self { epoch, inbox, wake }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Post a notification; silently dropped once the session is gone
    pub fn notify(&self, notification: BackendNotification) {
        trace!("Posting {:?} under epoch {}", notification, self.epoch);
        let envelope = Envelope {
            epoch: self.epoch,
            notification,
        };
        if self.inbox.send(envelope).is_ok() {
            self.wake.notify_one();
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("epoch", &self.epoch).finish()
    }
}

/// Completion handle passed along with a seek
#[derive(Debug)]
pub struct SeekCompletion {
    reason: SeekReason,
    notifier: Notifier,
}

impl SeekCompletion {
    pub fn new(reason: SeekReason, notifier: Notifier) -> Self {
        Self { reason, notifier }
    }

    pub fn reason(&self) -> SeekReason {
        self.reason
    }

    /// Report the seek as done; `finished` is false when it was interrupted
    pub fn complete(self, finished: bool) {
        self.notifier.notify(BackendNotification::SeekCompleted {
            reason: self.reason,
            finished,
        });
    }
}

/// Observer-registration table keyed by property
#[derive(Debug, Default)]
pub struct ObserverTable {
    observers: HashMap<ObservedProperty, Notifier>,
}

impl ObserverTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: ObservedProperty, notifier: Notifier) {
        self.observers.insert(property, notifier);
    }

    pub fn remove(&mut self, property: ObservedProperty) -> Option<Notifier> {
        self.observers.remove(&property)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Invoke the observer registered for `property`, if any
    pub fn notify(&self, property: ObservedProperty, notification: BackendNotification) {
        if let Some(notifier) = self.observers.get(&property) {
            notifier.notify(notification);
        }
    }
}
