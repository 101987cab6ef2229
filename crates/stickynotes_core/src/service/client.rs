//! Client handles used by display surfaces.
//!
//! A `NotesClient` never touches store memory directly: mutations travel as
//! messages to the worker, reads scan the last published snapshot. Every
//! handle follows the current store generation, so handles obtained before
//! a storage-root switch keep working afterwards.

use super::worker::{StoreRequest, WorkerLink};
use crate::model::note::{Note, NoteId, NotePatch};
use crate::model::trash::TrashedNote;
use crate::notify::{ChangeHub, Subscription};
use crate::search::matcher::{search_notes, SearchHit, SearchQuery};
use crate::store::{sort_for_listing, StoreError, StoreResult};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;

/// Pointer to whichever worker currently serves requests.
#[derive(Clone, Default)]
pub(crate) struct ClientSlot {
    current: Arc<RwLock<Option<WorkerLink>>>,
}

impl ClientSlot {
    pub(crate) fn replace(&self, link: Option<WorkerLink>) {
        *self.current.write() = link;
    }

    fn link(&self) -> StoreResult<WorkerLink> {
        self.current.read().clone().ok_or(StoreError::StoreUnavailable)
    }
}

/// Request/response handle for one surface. Cheap to clone.
#[derive(Clone)]
pub struct NotesClient {
    slot: ClientSlot,
    hub: ChangeHub,
}

impl NotesClient {
    pub(crate) fn new(slot: ClientSlot, hub: ChangeHub) -> Self {
        Self { slot, hub }
    }

    /// Connects this surface to change notifications.
    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    /// Generation counter of the store currently serving this client.
    pub fn generation(&self) -> StoreResult<u64> {
        Ok(self.slot.link()?.generation)
    }

    pub fn get_notes(&self, include_hidden: bool) -> StoreResult<Vec<Note>> {
        let snapshot = self.slot.link()?.read_snapshot();
        let mut notes = snapshot
            .iter()
            .filter(|note| include_hidden || !note.is_hidden)
            .cloned()
            .collect::<Vec<_>>();
        sort_for_listing(&mut notes);
        Ok(notes)
    }

    pub fn get_note(&self, id: NoteId) -> StoreResult<Note> {
        let snapshot = self.slot.link()?.read_snapshot();
        snapshot
            .iter()
            .find(|note| note.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Searches visible notes. Runs on the caller's thread.
    pub fn search_notes(&self, query: &str) -> StoreResult<Vec<SearchHit>> {
        self.search(&SearchQuery::new(query))
    }

    pub fn search(&self, query: &SearchQuery) -> StoreResult<Vec<SearchHit>> {
        let snapshot = self.slot.link()?.read_snapshot();
        Ok(search_notes(&snapshot, query))
    }

    pub fn create_note(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> StoreResult<Note> {
        let (title, content) = (title.into(), content.into());
        self.call(|reply| StoreRequest::Create {
            title,
            content,
            reply,
        })?
    }

    pub fn update_note(&self, id: NoteId, patch: NotePatch) -> StoreResult<Note> {
        self.call(|reply| StoreRequest::Update { id, patch, reply })?
    }

    pub fn set_pinned(&self, id: NoteId, pinned: bool) -> StoreResult<Note> {
        self.update_note(id, NotePatch::default().pinned(pinned))
    }

    pub fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.call(|reply| StoreRequest::Delete { id, reply })?
    }

    /// Returns the new `is_hidden` value.
    pub fn toggle_hidden(&self, id: NoteId) -> StoreResult<bool> {
        self.call(|reply| StoreRequest::ToggleHidden { id, reply })?
    }

    /// Returns how many notes became visible.
    pub fn unhide_all(&self) -> StoreResult<usize> {
        self.call(|reply| StoreRequest::UnhideAll { reply })?
    }

    pub fn restore_note(&self, id: NoteId) -> StoreResult<Note> {
        self.call(|reply| StoreRequest::Restore { id, reply })?
    }

    pub fn list_trash(&self) -> StoreResult<Vec<TrashedNote>> {
        self.call(|reply| StoreRequest::ListTrash { reply })
    }

    /// Sends one request and blocks until the worker replies.
    ///
    /// The reply only arrives after the durable write finished or failed.
    fn call<T>(
        &self,
        build: impl FnOnce(SyncSender<T>) -> StoreRequest,
    ) -> StoreResult<T> {
        let link = self.slot.link()?;
        let (reply, receiver): (SyncSender<T>, Receiver<T>) = mpsc::sync_channel(1);
        link.sender
            .send(build(reply))
            .map_err(|_| StoreError::StoreUnavailable)?;
        receiver.recv().map_err(|_| StoreError::StoreUnavailable)
    }
}
