//! Subscriber registry backed by one unbounded channel per surface.

use crate::model::note::NoteId;
use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// What kind of mutation produced a `NoteChanged` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    Restored,
    VisibilityChanged,
}

impl ChangeKind {
    /// Whether a surface should reload its whole list rather than one note.
    pub fn affects_listing(self) -> bool {
        !matches!(self, Self::Updated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Restored => "restored",
            Self::VisibilityChanged => "visibility_changed",
        }
    }
}

/// Event pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    NoteChanged { id: NoteId, kind: ChangeKind },
    /// The storage root changed; all cached note state must be reloaded.
    Invalidated { root: PathBuf },
}

struct Subscriber {
    id: u64,
    sender: Sender<ChangeEvent>,
}

/// Fan-out hub shared by the store worker and the root manager.
#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a new surface. Dropping the subscription disconnects it.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push(Subscriber { id, sender });
        debug!("event=hub_subscribe module=notify status=ok subscriber={}", id);
        Subscription {
            id,
            receiver,
            hub: self.clone(),
        }
    }

    /// Sends `event` to every live subscriber and prunes dead ones.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|subscriber| subscriber.sender.send(event.clone()).is_ok());
    }

    pub fn note_changed(&self, id: NoteId, kind: ChangeKind) {
        self.publish(ChangeEvent::NoteChanged { id, kind });
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn unsubscribe(&self, id: u64) {
        self.inner
            .subscribers
            .lock()
            .retain(|subscriber| subscriber.id != id);
        debug!("event=hub_unsubscribe module=notify status=ok subscriber={}", id);
    }
}

/// Receiving end held by one surface.
pub struct Subscription {
    id: u64,
    receiver: Receiver<ChangeEvent>,
    hub: ChangeHub,
}

impl Subscription {
    /// Returns the next pending event without waiting.
    pub fn try_next(&self) -> Option<ChangeEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every pending event.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
