//! Storage-root lifecycle manager.
//!
//! # Responsibility
//! - Own the running store generation and the shared notification hub.
//! - Perform root relocation as an explicit teardown → construct → broadcast
//!   transition.
//!
//! # Invariants
//! - The old store is never asked to write after a switch begins, and nothing
//!   is copied between roots.
//! - Auto-save tasks bound to the old store are suspended before it stops.
//! - If the new root cannot be opened, the old store keeps serving.

use crate::notify::{ChangeEvent, ChangeHub};
use crate::service::client::ClientSlot;
use crate::service::{NotesClient, StoreWorker};
use crate::session::{AutoSaveRegistry, SurfaceSession};
use crate::settings::UserSettings;
use crate::store::{NoteStore, StoreResult};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of a `switch_root` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSwitch {
    /// The requested root is already active.
    Unchanged,
    Switched {
        previous: PathBuf,
        current: PathBuf,
        /// Auto-save tasks that were suspended.
        suspended_auto_saves: usize,
        /// Where an unreadable collection at the new root was preserved.
        recovered_from: Option<PathBuf>,
    },
}

/// Process-level owner of the note store.
pub struct RootManager {
    hub: ChangeHub,
    slot: ClientSlot,
    auto_saves: AutoSaveRegistry,
    worker: Option<StoreWorker>,
    generation: u64,
}

impl RootManager {
    /// Opens the store at `root` and starts its worker.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let hub = ChangeHub::new();
        let worker = StoreWorker::spawn(NoteStore::open(root)?, hub.clone(), 0)?;
        let slot = ClientSlot::default();
        slot.replace(Some(worker.link()));

        Ok(Self {
            hub,
            slot,
            auto_saves: AutoSaveRegistry::new(),
            worker: Some(worker),
            generation: 0,
        })
    }

    /// Opens the store at the root resolved from `settings`.
    pub fn open_with_settings(settings: &UserSettings, app_dir: &Path) -> StoreResult<Self> {
        Self::open(settings.resolve_data_dir(app_dir))
    }

    /// A new request handle for a surface.
    pub fn client(&self) -> NotesClient {
        NotesClient::new(self.slot.clone(), self.hub.clone())
    }

    /// Connects a new surface session bound to this manager's auto-save
    /// registry.
    pub fn connect_surface(&self) -> SurfaceSession {
        SurfaceSession::connect(self.client(), self.auto_saves.clone())
    }

    pub fn auto_saves(&self) -> &AutoSaveRegistry {
        &self.auto_saves
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    pub fn current_root(&self) -> Option<&Path> {
        self.worker.as_ref().map(StoreWorker::root)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Where an unreadable collection was preserved when the current store
    /// opened.
    pub fn recovered_from(&self) -> Option<&Path> {
        self.worker.as_ref().and_then(StoreWorker::recovered_from)
    }

    /// Relocates the store to `new_root`.
    ///
    /// Steps: open the new store and start its worker, suspend auto-save,
    /// swap clients over, stop the old worker, broadcast invalidation. A
    /// failure before the swap leaves the old store and auto-save running.
    pub fn switch_root(&mut self, new_root: impl Into<PathBuf>) -> StoreResult<RootSwitch> {
        let new_root = new_root.into();
        let previous = match self.current_root() {
            Some(root) if root == new_root => return Ok(RootSwitch::Unchanged),
            Some(root) => root.to_path_buf(),
            None => PathBuf::new(),
        };

        let started_at = Instant::now();
        info!(
            "event=root_switch module=lifecycle status=start from={} to={}",
            previous.display(),
            new_root.display()
        );

        let store = match NoteStore::open(&new_root) {
            Ok(store) => store,
            Err(err) => {
                error!(
                    "event=root_switch module=lifecycle status=error error_code={} error={}",
                    err.code(),
                    err
                );
                return Err(err);
            }
        };
        let generation = self.generation + 1;
        let worker = StoreWorker::spawn(store, self.hub.clone(), generation)?;
        let recovered_from = worker.recovered_from().map(Path::to_path_buf);
        let suspended_auto_saves = self.auto_saves.suspend_all();

        // Point clients at the new worker first so nothing new reaches the old
        // one, then let it drain what was already queued against the old root.
        self.slot.replace(Some(worker.link()));
        if let Some(old) = self.worker.replace(worker) {
            old.shutdown();
        }
        self.generation = generation;

        self.hub.publish(ChangeEvent::Invalidated {
            root: new_root.clone(),
        });
        info!(
            "event=root_switch module=lifecycle status=ok generation={} suspended_auto_saves={} duration_ms={}",
            generation,
            suspended_auto_saves,
            started_at.elapsed().as_millis()
        );

        Ok(RootSwitch::Switched {
            previous,
            current: new_root,
            suspended_auto_saves,
            recovered_from,
        })
    }

    /// Switches roots when `settings` resolve to a different data dir.
    pub fn apply_settings(
        &mut self,
        settings: &UserSettings,
        app_dir: &Path,
    ) -> StoreResult<RootSwitch> {
        self.switch_root(settings.resolve_data_dir(app_dir))
    }

    /// Stops auto-save and the worker. Clients get `StoreUnavailable` after.
    pub fn shutdown(&mut self) {
        self.auto_saves.suspend_all();
        self.slot.replace(None);
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

impl Drop for RootManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
