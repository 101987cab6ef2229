//! Per-surface editing session.
//!
//! A surface (main editor or a popped-out note window) keeps a local draft of
//! at most one note, the last state it knows was saved, a change
//! subscription, and optionally an auto-save timer. It only ever talks to the
//! store through its `NotesClient`.

use super::autosave::{AutoSaveRegistry, AutoSaveTask};
use crate::model::note::{Note, NoteId, NotePatch};
use crate::notify::{ChangeEvent, ChangeKind, Subscription};
use crate::service::NotesClient;
use crate::store::{StoreError, StoreResult};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// What the surface should redraw after processing pending events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRefresh {
    /// The note list (visibility, membership or order) may have changed.
    ReloadList,
    /// The open note was changed elsewhere and reloaded into the draft.
    ReloadNote(NoteId),
    /// The open note was deleted elsewhere and the draft was dropped.
    NoteClosed(NoteId),
    /// The storage root changed; every cached note is stale.
    ReloadAll,
}

#[derive(Debug, Default)]
struct EditorState {
    note_id: Option<NoteId>,
    draft_title: String,
    draft_content: String,
    saved_title: String,
    saved_content: String,
}

impl EditorState {
    fn load(&mut self, note: &Note) {
        self.note_id = Some(note.id);
        self.draft_title = note.title.clone();
        self.draft_content = note.content.clone();
        self.saved_title = note.title.clone();
        self.saved_content = note.content.clone();
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_dirty(&self) -> bool {
        self.note_id.is_some()
            && (self.draft_title != self.saved_title || self.draft_content != self.saved_content)
    }
}

/// Session state owned by one display surface.
pub struct SurfaceSession {
    client: NotesClient,
    subscription: Subscription,
    editor: Arc<Mutex<EditorState>>,
    registry: AutoSaveRegistry,
    auto_save: Option<AutoSaveTask>,
}

impl SurfaceSession {
    /// Connects a new surface: subscribes to changes, no note open yet.
    pub fn connect(client: NotesClient, registry: AutoSaveRegistry) -> Self {
        let subscription = client.subscribe();
        Self {
            client,
            subscription,
            editor: Arc::new(Mutex::new(EditorState::default())),
            registry,
            auto_save: None,
        }
    }

    pub fn client(&self) -> &NotesClient {
        &self.client
    }

    /// Loads a note into the local draft, discarding unsaved local edits.
    pub fn open_note(&self, id: NoteId) -> StoreResult<Note> {
        let note = self.client.get_note(id)?;
        self.editor.lock().load(&note);
        Ok(note)
    }

    pub fn open_note_id(&self) -> Option<NoteId> {
        self.editor.lock().note_id
    }

    /// Replaces the draft title and/or content. Nothing is saved yet.
    pub fn edit(&self, title: Option<String>, content: Option<String>) {
        let mut editor = self.editor.lock();
        if let Some(title) = title {
            editor.draft_title = title;
        }
        if let Some(content) = content {
            editor.draft_content = content;
        }
    }

    /// Current draft as `(title, content)`.
    pub fn draft(&self) -> (String, String) {
        let editor = self.editor.lock();
        (editor.draft_title.clone(), editor.draft_content.clone())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.editor.lock().is_dirty()
    }

    /// Saves the draft when it differs from the last saved state.
    ///
    /// Returns `Ok(None)` when there was nothing to save.
    pub fn save_now(&self) -> StoreResult<Option<Note>> {
        save_draft(&self.client, &self.editor)
    }

    /// Starts (or restarts) periodic auto-save of the draft.
    pub fn start_auto_save(&mut self, interval: Duration) -> std::io::Result<()> {
        self.stop_auto_save();
        let client = self.client.clone();
        let editor = Arc::clone(&self.editor);
        let task = AutoSaveTask::start(&self.registry, interval, move || {
            if let Err(err) = save_draft(&client, &editor) {
                warn!(
                    "event=autosave_tick module=session status=error error_code={} error={}",
                    err.code(),
                    err
                );
            }
        })?;
        self.auto_save = Some(task);
        Ok(())
    }

    pub fn stop_auto_save(&mut self) {
        if let Some(mut task) = self.auto_save.take() {
            task.stop();
        }
    }

    pub fn auto_save_running(&self) -> bool {
        self.auto_save.as_ref().is_some_and(AutoSaveTask::is_running)
    }

    /// Applies pending change events to local state.
    ///
    /// The open note is re-fetched when changed elsewhere, unless the local
    /// draft has unsaved edits (the next save wins, last-write-wins).
    pub fn process_changes(&mut self) -> Vec<SurfaceRefresh> {
        let mut actions = Vec::new();
        for event in self.subscription.drain() {
            match event {
                ChangeEvent::Invalidated { .. } => {
                    self.stop_auto_save();
                    self.editor.lock().clear();
                    push_unique(&mut actions, SurfaceRefresh::ReloadAll);
                }
                ChangeEvent::NoteChanged { id, kind } => {
                    if kind.affects_listing() {
                        push_unique(&mut actions, SurfaceRefresh::ReloadList);
                    }
                    if self.open_note_id() != Some(id) {
                        continue;
                    }
                    if let Some(action) = self.refresh_open_note(id, kind) {
                        push_unique(&mut actions, action);
                    }
                }
            }
        }
        actions
    }

    /// Stops auto-save, flushes the draft once, and disconnects.
    pub fn close(mut self) -> StoreResult<()> {
        self.stop_auto_save();
        match self.save_now() {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn refresh_open_note(&self, id: NoteId, kind: ChangeKind) -> Option<SurfaceRefresh> {
        if kind == ChangeKind::Deleted {
            self.editor.lock().clear();
            return Some(SurfaceRefresh::NoteClosed(id));
        }
        if self.has_unsaved_changes() {
            debug!(
                "event=surface_refresh module=session status=skipped reason=unsaved_draft note_id={}",
                id
            );
            return None;
        }
        match self.client.get_note(id) {
            Ok(note) => {
                self.editor.lock().load(&note);
                Some(SurfaceRefresh::ReloadNote(id))
            }
            Err(_) => {
                self.editor.lock().clear();
                Some(SurfaceRefresh::NoteClosed(id))
            }
        }
    }
}

impl Drop for SurfaceSession {
    fn drop(&mut self) {
        self.stop_auto_save();
    }
}

fn save_draft(client: &NotesClient, editor: &Mutex<EditorState>) -> StoreResult<Option<Note>> {
    let (id, title, content) = {
        let state = editor.lock();
        let Some(id) = state.note_id else {
            return Ok(None);
        };
        if !state.is_dirty() {
            return Ok(None);
        }
        (id, state.draft_title.clone(), state.draft_content.clone())
    };

    let patch = NotePatch::default()
        .title(title.clone())
        .content(content.clone());
    let saved = client.update_note(id, patch)?;

    let mut state = editor.lock();
    if state.note_id == Some(id) {
        // The draft may have moved on while the request was in flight; keep
        // those newer edits dirty against the stored values.
        let untouched = state.draft_title == title && state.draft_content == content;
        state.saved_title = saved.title.clone();
        state.saved_content = saved.content.clone();
        if untouched {
            state.draft_title = saved.title.clone();
            state.draft_content = saved.content.clone();
        }
    }
    Ok(Some(saved))
}

fn push_unique(actions: &mut Vec<SurfaceRefresh>, action: SurfaceRefresh) {
    if !actions.contains(&action) {
        actions.push(action);
    }
}
