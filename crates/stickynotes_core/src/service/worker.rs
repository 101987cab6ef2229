//! Single-writer store worker.
//!
//! One thread owns the `NoteStore` and drains a request queue in order, so
//! no two mutations ever interleave their read-modify-write-persist steps.
//! After each durable write it publishes a fresh snapshot for readers and
//! then notifies subscribers, before replying to the caller.

use crate::model::note::{Note, NoteId, NotePatch};
use crate::model::trash::TrashedNote;
use crate::notify::{ChangeHub, ChangeKind};
use crate::storage::StorageError;
use crate::store::{NoteStore, StoreError, StoreResult};
use log::{debug, error, info};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Requests accepted by the worker. Each carries its own reply channel.
pub(crate) enum StoreRequest {
    Create {
        title: String,
        content: String,
        reply: SyncSender<StoreResult<Note>>,
    },
    Update {
        id: NoteId,
        patch: NotePatch,
        reply: SyncSender<StoreResult<Note>>,
    },
    Delete {
        id: NoteId,
        reply: SyncSender<StoreResult<()>>,
    },
    ToggleHidden {
        id: NoteId,
        reply: SyncSender<StoreResult<bool>>,
    },
    UnhideAll {
        reply: SyncSender<StoreResult<usize>>,
    },
    Restore {
        id: NoteId,
        reply: SyncSender<StoreResult<Note>>,
    },
    ListTrash {
        reply: SyncSender<Vec<TrashedNote>>,
    },
    Shutdown,
}

/// Shared pointer to the latest published active set.
pub(crate) type SnapshotCell = Arc<RwLock<Arc<[Note]>>>;

/// Cloneable connection to one running worker.
#[derive(Clone)]
pub(crate) struct WorkerLink {
    pub(crate) sender: Sender<StoreRequest>,
    pub(crate) snapshot: SnapshotCell,
    pub(crate) generation: u64,
}

impl WorkerLink {
    pub(crate) fn read_snapshot(&self) -> Arc<[Note]> {
        Arc::clone(&self.snapshot.read())
    }
}

/// Owner of one store generation's worker thread.
pub struct StoreWorker {
    link: WorkerLink,
    root: PathBuf,
    recovered_from: Option<PathBuf>,
    handle: Option<JoinHandle<()>>,
}

impl StoreWorker {
    /// Moves `store` onto a dedicated worker thread.
    pub fn spawn(store: NoteStore, hub: ChangeHub, generation: u64) -> StoreResult<Self> {
        let root = store.root().to_path_buf();
        let recovered_from = store.recovered_from().map(Path::to_path_buf);
        let snapshot: SnapshotCell = Arc::new(RwLock::new(store.snapshot()));
        let (sender, receiver) = mpsc::channel();

        let loop_snapshot = Arc::clone(&snapshot);
        let handle = thread::Builder::new()
            .name(format!("stickynotes-store-{generation}"))
            .spawn(move || worker_loop(store, receiver, loop_snapshot, hub))
            .map_err(|err| StoreError::Storage(StorageError::io(&root, err)))?;

        info!(
            "event=worker_start module=service status=ok generation={} root={}",
            generation,
            root.display()
        );

        Ok(Self {
            link: WorkerLink {
                sender,
                snapshot,
                generation,
            },
            root,
            recovered_from,
            handle: Some(handle),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generation(&self) -> u64 {
        self.link.generation
    }

    /// Where an unreadable collection was preserved when this store opened.
    pub fn recovered_from(&self) -> Option<&Path> {
        self.recovered_from.as_deref()
    }

    pub(crate) fn link(&self) -> WorkerLink {
        self.link.clone()
    }

    /// Stops the worker after it finishes already-queued requests.
    ///
    /// The store is dropped without any extra write: every accepted mutation
    /// was already persisted when it completed.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.link.sender.send(StoreRequest::Shutdown);
        if handle.join().is_err() {
            error!(
                "event=worker_stop module=service status=error generation={} error_code=worker_panicked",
                self.link.generation
            );
            return;
        }
        info!(
            "event=worker_stop module=service status=ok generation={}",
            self.link.generation
        );
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    mut store: NoteStore,
    receiver: Receiver<StoreRequest>,
    snapshot: SnapshotCell,
    hub: ChangeHub,
) {
    let publish = |store: &NoteStore| {
        *snapshot.write() = store.snapshot();
    };

    while let Ok(request) = receiver.recv() {
        match request {
            StoreRequest::Create {
                title,
                content,
                reply,
            } => {
                let result = store.create(&title, &content);
                if let Ok(note) = result.as_ref() {
                    publish(&store);
                    hub.note_changed(note.id, ChangeKind::Created);
                }
                let _ = reply.send(result);
            }
            StoreRequest::Update { id, patch, reply } => {
                let result = store.update(id, &patch).map(|outcome| {
                    if outcome.changed {
                        publish(&store);
                        hub.note_changed(id, ChangeKind::Updated);
                    }
                    outcome.note
                });
                let _ = reply.send(result);
            }
            StoreRequest::Delete { id, reply } => {
                let result = store.delete(id);
                if result.is_ok() {
                    publish(&store);
                    hub.note_changed(id, ChangeKind::Deleted);
                }
                let _ = reply.send(result);
            }
            StoreRequest::ToggleHidden { id, reply } => {
                let result = store.toggle_hidden(id);
                if result.is_ok() {
                    publish(&store);
                    hub.note_changed(id, ChangeKind::VisibilityChanged);
                }
                let _ = reply.send(result);
            }
            StoreRequest::UnhideAll { reply } => {
                let result = store.unhide_all().map(|affected| {
                    if !affected.is_empty() {
                        publish(&store);
                        for id in &affected {
                            hub.note_changed(*id, ChangeKind::VisibilityChanged);
                        }
                    }
                    affected.len()
                });
                let _ = reply.send(result);
            }
            StoreRequest::Restore { id, reply } => {
                let result = store.restore(id);
                if result.is_ok() {
                    publish(&store);
                    hub.note_changed(id, ChangeKind::Restored);
                }
                let _ = reply.send(result);
            }
            StoreRequest::ListTrash { reply } => {
                let _ = reply.send(store.list_trash());
            }
            StoreRequest::Shutdown => {
                debug!("event=worker_loop module=service status=shutdown");
                break;
            }
        }
    }
}
