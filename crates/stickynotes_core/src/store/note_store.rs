//! File-backed note store.
//!
//! Every mutation follows the same shape: build the next collection from a
//! copy, write it durably, then commit the copy. A failed write leaves the
//! committed state untouched, which is the rollback.

use super::{StoreError, StoreResult};
use crate::clock::now_epoch_ms;
use crate::model::note::{normalize_title, validate_content, Note, NoteId, NotePatch};
use crate::model::trash::TrashedNote;
use crate::storage::{CollectionFile, StorageError, StoragePaths, TrashArea};
use log::{error, info, warn};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Result of an `update`-style call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub note: Note,
    /// `false` when the request matched stored values and nothing was written.
    pub changed: bool,
}

/// Authoritative note collection bound to one storage root.
pub struct NoteStore {
    paths: StoragePaths,
    collection: CollectionFile,
    trash: TrashArea,
    notes: Vec<Note>,
    trashed: Vec<TrashedNote>,
    recovered_from: Option<PathBuf>,
}

impl NoteStore {
    /// Opens the store under `root`, creating directories as needed.
    ///
    /// # Errors
    /// - `StoreError::Storage` when the root cannot be created or read, or an
    ///   unreadable collection cannot be preserved.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let paths = StoragePaths::new(root);
        info!(
            "event=store_open module=store status=start root={}",
            paths.root().display()
        );
        paths.ensure_dirs().map_err(StoreError::Storage)?;

        let collection = CollectionFile::new(paths.clone());
        let trash = TrashArea::new(&paths);
        let report = collection.load().map_err(StoreError::Storage)?;
        let active_ids = report.notes.iter().map(|note| note.id).collect::<HashSet<_>>();

        let mut trashed = trash.load().map_err(StoreError::Storage)?;
        trashed.retain(|item| {
            let keep = !active_ids.contains(&item.note.id);
            if !keep {
                warn!(
                    "event=store_open module=store status=skipped reason=trash_shadowed note_id={}",
                    item.note.id
                );
            }
            keep
        });

        info!(
            "event=store_open module=store status=ok notes={} trashed={} recovered={}",
            report.notes.len(),
            trashed.len(),
            report.recovered_from.is_some()
        );

        Ok(Self {
            paths,
            collection,
            trash,
            notes: report.notes,
            trashed,
            recovered_from: report.recovered_from,
        })
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Where an unreadable collection was preserved during `open`, if any.
    pub fn recovered_from(&self) -> Option<&Path> {
        self.recovered_from.as_deref()
    }

    /// Immutable copy of the active set for lock-free readers.
    pub fn snapshot(&self) -> Arc<[Note]> {
        Arc::from(self.notes.as_slice())
    }

    pub fn create(&mut self, title: &str, content: &str) -> StoreResult<Note> {
        let title = normalize_title(title)?;
        validate_content(content)?;

        let note = Note::new(self.fresh_id(), title, content.to_string(), now_epoch_ms());
        let mut next = self.notes.clone();
        next.push(note.clone());
        self.commit(next, "note_create", note.id)?;
        Ok(note)
    }

    pub fn get(&self, id: NoteId) -> StoreResult<Note> {
        self.notes
            .iter()
            .find(|note| note.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Active notes, pinned first, then most recently updated.
    pub fn list(&self, include_hidden: bool) -> Vec<Note> {
        let mut notes = self
            .notes
            .iter()
            .filter(|note| include_hidden || !note.is_hidden)
            .cloned()
            .collect::<Vec<_>>();
        sort_for_listing(&mut notes);
        notes
    }

    /// Merges supplied fields into one note.
    ///
    /// Identical values are a no-op: `changed == false`, no write.
    pub fn update(&mut self, id: NoteId, patch: &NotePatch) -> StoreResult<UpdateOutcome> {
        let patch = patch.normalized()?;
        let index = self.index_of(id)?;

        let mut next = self.notes.clone();
        let note = &mut next[index];
        if !note.apply(&patch) {
            return Ok(UpdateOutcome {
                note: note.clone(),
                changed: false,
            });
        }
        note.touch(now_epoch_ms());
        let updated = note.clone();

        self.commit(next, "note_update", id)?;
        Ok(UpdateOutcome {
            note: updated,
            changed: true,
        })
    }

    pub fn set_pinned(&mut self, id: NoteId, pinned: bool) -> StoreResult<UpdateOutcome> {
        self.update(id, &NotePatch::default().pinned(pinned))
    }

    /// Flips `is_hidden` and returns the new value.
    pub fn toggle_hidden(&mut self, id: NoteId) -> StoreResult<bool> {
        let index = self.index_of(id)?;

        let mut next = self.notes.clone();
        let note = &mut next[index];
        note.is_hidden = !note.is_hidden;
        note.touch(now_epoch_ms());
        let is_hidden = note.is_hidden;

        self.commit(next, "note_toggle_hidden", id)?;
        Ok(is_hidden)
    }

    /// Makes every hidden note visible and returns the affected ids.
    pub fn unhide_all(&mut self) -> StoreResult<Vec<NoteId>> {
        let now = now_epoch_ms();
        let mut next = self.notes.clone();
        let mut affected = Vec::new();
        for note in next.iter_mut().filter(|note| note.is_hidden) {
            note.is_hidden = false;
            note.touch(now);
            affected.push(note.id);
        }

        if affected.is_empty() {
            return Ok(affected);
        }

        self.save_next(&next, "note_unhide_all")?;
        self.notes = next;
        info!(
            "event=note_unhide_all module=store status=ok count={}",
            affected.len()
        );
        Ok(affected)
    }

    /// Moves a note to the trash.
    ///
    /// The trash entry is written before the collection so a crash between the
    /// two steps leaves the note recoverable rather than lost.
    pub fn delete(&mut self, id: NoteId) -> StoreResult<()> {
        let index = self.index_of(id)?;

        let mut next = self.notes.clone();
        let note = next.remove(index);
        let item = TrashedNote {
            note,
            deleted_at: now_epoch_ms(),
        };

        if let Err(err) = self.trash.put(&item) {
            error!(
                "event=note_delete module=store status=error error_code=trash_write_failed note_id={} error={}",
                id, err
            );
            return Err(StoreError::PersistenceFailure(err));
        }
        if let Err(err) = self.save_next(&next, "note_delete") {
            if let Err(cleanup) = self.trash.remove(id) {
                warn!(
                    "event=note_delete module=store status=error error_code=trash_rollback_failed note_id={} error={}",
                    id, cleanup
                );
            }
            return Err(err);
        }

        self.notes = next;
        self.trashed.push(item);
        info!("event=note_delete module=store status=ok note_id={}", id);
        Ok(())
    }

    /// Returns a trashed note to the active set with its original id.
    pub fn restore(&mut self, id: NoteId) -> StoreResult<Note> {
        let position = self
            .trashed
            .iter()
            .position(|item| item.note.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut note = self.trashed[position].note.clone();
        note.touch(now_epoch_ms());
        let mut next = self.notes.clone();
        next.push(note.clone());

        self.save_next(&next, "note_restore")?;
        if let Err(err) = self.trash.remove(id) {
            error!(
                "event=note_restore module=store status=error error_code=trash_remove_failed note_id={} error={}",
                id, err
            );
            if let Err(rollback) = self.collection.save(&self.notes) {
                warn!(
                    "event=note_restore module=store status=error error_code=rollback_failed note_id={} error={}",
                    id, rollback
                );
            }
            return Err(StoreError::PersistenceFailure(err));
        }

        self.notes = next;
        self.trashed.remove(position);
        info!("event=note_restore module=store status=ok note_id={}", id);
        Ok(note)
    }

    /// Trashed notes, most recently deleted first.
    pub fn list_trash(&self) -> Vec<TrashedNote> {
        let mut items = self.trashed.clone();
        items.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then_with(|| a.note.id.cmp(&b.note.id))
        });
        items
    }

    fn index_of(&self, id: NoteId) -> StoreResult<usize> {
        self.notes
            .iter()
            .position(|note| note.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn fresh_id(&self) -> NoteId {
        loop {
            let candidate = Uuid::new_v4();
            let taken = self.notes.iter().any(|note| note.id == candidate)
                || self.trashed.iter().any(|item| item.note.id == candidate);
            if !taken {
                return candidate;
            }
        }
    }

    fn commit(&mut self, next: Vec<Note>, event: &str, id: NoteId) -> StoreResult<()> {
        self.save_next(&next, event)?;
        self.notes = next;
        info!("event={} module=store status=ok note_id={}", event, id);
        Ok(())
    }

    fn save_next(&self, next: &[Note], event: &str) -> StoreResult<()> {
        self.collection.save(next).map_err(|err: StorageError| {
            error!(
                "event={} module=store status=error error_code=persistence_failure error={}",
                event, err
            );
            StoreError::PersistenceFailure(err)
        })
    }
}

/// Listing order: pinned first, then `updated_at` descending, then id.
pub fn sort_for_listing(notes: &mut [Note]) {
    notes.sort_by(compare_for_listing);
}

fn compare_for_listing(a: &Note, b: &Note) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.id.cmp(&b.id))
}
