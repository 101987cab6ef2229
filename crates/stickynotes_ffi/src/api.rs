//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose note operations to Dart via FRB as plain envelopes.
//! - Own the process-wide `RootManager` and settings file for the UI.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failed calls return `ok=false` with a stable `error_code`.
//! - Mutating calls go through one `NotesClient`; the store worker serializes
//!   them.

use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use stickynotes_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ChangeEvent, Geometry, Note, NoteId, NotePatch, NotesClient, RootManager, RootSwitch,
    SearchHit, SearchQuery, SettingsFile, StoreError, Subscription, TrashedNote,
};

/// Environment variable that pins the storage root, ignoring `data_path`.
pub const DATA_DIR_ENV: &str = "STICKYNOTES_DATA_DIR";
const NOT_INITIALIZED: &str = "not_initialized";
const INVALID_ID: &str = "invalid_id";
const INVALID_SETTINGS: &str = "invalid_settings";

static RUNTIME: Mutex<Option<NotesRuntime>> = Mutex::new(None);
static SUBSCRIPTIONS: Mutex<Option<SubscriptionTable>> = Mutex::new(None);

struct NotesRuntime {
    app_dir: PathBuf,
    data_dir_override: Option<PathBuf>,
    settings: SettingsFile,
    manager: RootManager,
}

#[derive(Default)]
struct SubscriptionTable {
    next_id: u64,
    entries: HashMap<u64, Subscription>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Flat note record for Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    pub is_hidden: bool,
    pub is_pinned: bool,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Floating-window rectangle supplied by a popped-out note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteGeometry {
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Response for calls returning one note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteResponse {
    pub ok: bool,
    pub note: Option<NoteItem>,
    /// Stable machine-readable code when `ok` is false.
    pub error_code: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

/// Response for list-style calls.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteListResponse {
    pub ok: bool,
    pub items: Vec<NoteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// One search hit with its highlight excerpt.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub note: NoteItem,
    pub title_match: bool,
    pub match_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub ok: bool,
    pub items: Vec<SearchItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// One trashed note.
#[derive(Debug, Clone, PartialEq)]
pub struct TrashItem {
    pub note: NoteItem,
    pub deleted_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrashListResponse {
    pub ok: bool,
    pub items: Vec<TrashItem>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesActionResponse {
    pub ok: bool,
    /// New `is_hidden` value, for `toggle_hidden`.
    pub is_hidden: Option<bool>,
    /// Affected note count, for `unhide_all`.
    pub affected: u32,
    pub error_code: Option<String>,
    pub message: String,
}

/// Settings read/write response. `settings_json` holds the full effective
/// settings object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsResponse {
    pub ok: bool,
    pub settings_json: String,
    /// Whether saving moved the storage root.
    pub root_changed: bool,
    pub error_code: Option<String>,
    pub message: String,
}

/// Change event flattened for Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeItem {
    /// `created|updated|deleted|restored|visibility_changed|invalidated`.
    pub kind: String,
    pub note_id: Option<String>,
    /// New storage root, for `invalidated`.
    pub root: Option<String>,
}

impl NotesActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            is_hidden: None,
            affected: 0,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            is_hidden: None,
            affected: 0,
            error_code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

impl NoteResponse {
    fn success(message: impl Into<String>, note: Note) -> Self {
        Self {
            ok: true,
            note: Some(to_note_item(note)),
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            note: None,
            error_code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

/// Opens the note store for `app_dir`.
///
/// The storage root is `STICKYNOTES_DATA_DIR` when set, otherwise the
/// `data_path` setting resolved against `app_dir`.
///
/// # FFI contract
/// - Sync call; opens files and starts the store worker.
/// - Idempotent for the same `app_dir`; a different `app_dir` reopens.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_init(app_dir: String) -> NotesActionResponse {
    let trimmed = app_dir.trim();
    if trimmed.is_empty() {
        return NotesActionResponse::failure("invalid_app_dir", "app_dir cannot be empty");
    }
    let app_dir = PathBuf::from(trimmed);

    let mut runtime = lock_runtime();
    if runtime
        .as_ref()
        .is_some_and(|current| current.app_dir == app_dir)
    {
        return NotesActionResponse::success("Already initialized.");
    }
    if let Some(mut previous) = runtime.take() {
        previous.manager.shutdown();
    }

    let settings = SettingsFile::new(&app_dir);
    let data_dir_override = data_dir_override();
    let opened = match data_dir_override.as_ref() {
        Some(root) => RootManager::open(root),
        None => RootManager::open_with_settings(&settings.load(), &app_dir),
    };
    match opened {
        Ok(manager) => {
            let message = match manager.recovered_from() {
                Some(path) => format!(
                    "Initialized. Unreadable notes were preserved at {}.",
                    path.display()
                ),
                None => "Initialized.".to_string(),
            };
            info!(
                "event=ffi_init module=ffi status=ok override={}",
                data_dir_override.is_some()
            );
            *runtime = Some(NotesRuntime {
                app_dir,
                data_dir_override,
                settings,
                manager,
            });
            NotesActionResponse::success(message)
        }
        Err(err) => NotesActionResponse::failure(err.code(), format!("notes_init failed: {err}")),
    }
}

/// Stops the store worker. Later calls report `not_initialized`.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_shutdown() -> NotesActionResponse {
    if let Some(mut runtime) = lock_runtime().take() {
        runtime.manager.shutdown();
    }
    if let Some(table) = lock_subscriptions().as_mut() {
        table.entries.clear();
    }
    NotesActionResponse::success("Shut down.")
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_notes(include_hidden: bool) -> NoteListResponse {
    match with_client(|client| client.get_notes(include_hidden)) {
        Ok(notes) => NoteListResponse {
            ok: true,
            message: format!("Loaded {} note(s).", notes.len()),
            items: notes.into_iter().map(to_note_item).collect(),
            error_code: None,
        },
        Err((code, message)) => NoteListResponse {
            ok: false,
            items: Vec::new(),
            error_code: Some(code),
            message: format!("get_notes failed: {message}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_note(id: String) -> NoteResponse {
    note_call("get_note", &id, "Loaded.", |client, id| client.get_note(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_note(title: String, content: String) -> NoteResponse {
    match with_client(|client| client.create_note(title, content)) {
        Ok(note) => NoteResponse::success("Note created.", note),
        Err((code, message)) => {
            NoteResponse::failure(&code, format!("create_note failed: {message}"))
        }
    }
}

/// Updates the supplied fields only; `None` leaves a field untouched.
///
/// # FFI contract
/// - An update matching stored values succeeds without a write or event.
#[flutter_rust_bridge::frb(sync)]
pub fn update_note(
    id: String,
    title: Option<String>,
    content: Option<String>,
    is_pinned: Option<bool>,
    geometry: Option<NoteGeometry>,
) -> NoteResponse {
    let patch = NotePatch {
        title,
        content,
        is_pinned,
        geometry: geometry.map(|value| Geometry {
            position_x: value.position_x,
            position_y: value.position_y,
            width: value.width,
            height: value.height,
        }),
    };
    note_call("update_note", &id, "Note saved.", move |client, id| {
        client.update_note(id, patch)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_note(id: String) -> NotesActionResponse {
    action_call("delete_note", &id, |client, id| {
        client.delete_note(id)?;
        Ok(NotesActionResponse::success("Note moved to trash."))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn toggle_hidden(id: String) -> NotesActionResponse {
    action_call("toggle_hidden", &id, |client, id| {
        let is_hidden = client.toggle_hidden(id)?;
        let mut response = NotesActionResponse::success(if is_hidden {
            "Note hidden."
        } else {
            "Note shown."
        });
        response.is_hidden = Some(is_hidden);
        Ok(response)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn unhide_all() -> NotesActionResponse {
    match with_client(NotesClient::unhide_all) {
        Ok(count) => {
            let mut response =
                NotesActionResponse::success(format!("{count} note(s) made visible."));
            response.affected = u32::try_from(count).unwrap_or(u32::MAX);
            response
        }
        Err((code, message)) => {
            NotesActionResponse::failure(&code, format!("unhide_all failed: {message}"))
        }
    }
}

/// Case-insensitive literal search over titles and content.
///
/// # FFI contract
/// - Blank query returns the plain listing.
/// - Runs on the caller thread against the last published snapshot.
#[flutter_rust_bridge::frb(sync)]
pub fn search_notes(query: String, include_hidden: bool) -> SearchResponse {
    let mut search = SearchQuery::new(query);
    search.include_hidden = include_hidden;
    match with_client(|client| client.search(&search)) {
        Ok(hits) => SearchResponse {
            ok: true,
            message: if hits.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", hits.len())
            },
            items: hits.into_iter().map(to_search_item).collect(),
            error_code: None,
        },
        Err((code, message)) => SearchResponse {
            ok: false,
            items: Vec::new(),
            error_code: Some(code),
            message: format!("search_notes failed: {message}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn restore_note(id: String) -> NoteResponse {
    note_call("restore_note", &id, "Note restored.", |client, id| {
        client.restore_note(id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_trash() -> TrashListResponse {
    match with_client(NotesClient::list_trash) {
        Ok(items) => TrashListResponse {
            ok: true,
            message: format!("{} note(s) in trash.", items.len()),
            items: items.into_iter().map(to_trash_item).collect(),
            error_code: None,
        },
        Err((code, message)) => TrashListResponse {
            ok: false,
            items: Vec::new(),
            error_code: Some(code),
            message: format!("list_trash failed: {message}"),
        },
    }
}

/// Returns the effective settings as a JSON object.
#[flutter_rust_bridge::frb(sync)]
pub fn get_settings() -> SettingsResponse {
    let runtime = lock_runtime();
    let Some(runtime) = runtime.as_ref() else {
        return settings_failure(NOT_INITIALIZED, "notes_init has not been called");
    };
    match serde_json::to_string(&runtime.settings.load()) {
        Ok(settings_json) => SettingsResponse {
            ok: true,
            settings_json,
            root_changed: false,
            error_code: None,
            message: "Loaded.".to_string(),
        },
        Err(err) => settings_failure(INVALID_SETTINGS, err.to_string()),
    }
}

/// Merges a JSON object of setting updates, saves, and applies them.
///
/// A changed `data_path` relocates the store unless `STICKYNOTES_DATA_DIR`
/// pins the root. Subscribers then receive an `invalidated` change.
#[flutter_rust_bridge::frb(sync)]
pub fn save_settings(updates_json: String) -> SettingsResponse {
    let updates = match serde_json::from_str::<Value>(&updates_json) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return settings_failure(INVALID_SETTINGS, "settings must be a JSON object"),
        Err(err) => return settings_failure(INVALID_SETTINGS, err.to_string()),
    };

    let mut runtime = lock_runtime();
    let Some(runtime) = runtime.as_mut() else {
        return settings_failure(NOT_INITIALIZED, "notes_init has not been called");
    };
    apply_settings(runtime, updates)
}

/// Registers a change subscription and returns its handle.
///
/// Returns `0` when the store is not initialized.
#[flutter_rust_bridge::frb(sync)]
pub fn subscribe_changes() -> u64 {
    let subscription = match lock_runtime().as_ref() {
        Some(runtime) => runtime.manager.client().subscribe(),
        None => return 0,
    };
    let mut table = lock_subscriptions();
    let table = table.get_or_insert_with(SubscriptionTable::default);
    table.next_id += 1;
    let id = table.next_id;
    table.entries.insert(id, subscription);
    id
}

/// Drains pending changes for a subscription. Unknown handles yield nothing.
#[flutter_rust_bridge::frb(sync)]
pub fn poll_changes(subscription_id: u64) -> Vec<ChangeItem> {
    lock_subscriptions()
        .as_ref()
        .and_then(|table| table.entries.get(&subscription_id))
        .map(|subscription| {
            subscription
                .drain()
                .into_iter()
                .map(to_change_item)
                .collect()
        })
        .unwrap_or_default()
}

/// Drops a subscription. Returns whether the handle was known.
#[flutter_rust_bridge::frb(sync)]
pub fn unsubscribe_changes(subscription_id: u64) -> bool {
    lock_subscriptions()
        .as_mut()
        .and_then(|table| table.entries.remove(&subscription_id))
        .is_some()
}

fn apply_settings(runtime: &mut NotesRuntime, updates: Map<String, Value>) -> SettingsResponse {
    let settings = match runtime.settings.update(updates) {
        Ok(settings) => settings,
        Err(err) => return settings_failure(INVALID_SETTINGS, err.to_string()),
    };
    let settings_json = match serde_json::to_string(&settings) {
        Ok(json) => json,
        Err(err) => return settings_failure(INVALID_SETTINGS, err.to_string()),
    };

    if runtime.data_dir_override.is_some() {
        return SettingsResponse {
            ok: true,
            settings_json,
            root_changed: false,
            error_code: None,
            message: format!("Saved. Storage root pinned by {DATA_DIR_ENV}."),
        };
    }

    match runtime.manager.apply_settings(&settings, &runtime.app_dir) {
        Ok(RootSwitch::Unchanged) => SettingsResponse {
            ok: true,
            settings_json,
            root_changed: false,
            error_code: None,
            message: "Saved.".to_string(),
        },
        Ok(RootSwitch::Switched { .. }) => SettingsResponse {
            ok: true,
            settings_json,
            root_changed: true,
            error_code: None,
            message: "Saved. Notes reloaded from the new data path.".to_string(),
        },
        Err(err) => {
            warn!(
                "event=ffi_settings module=ffi status=error error_code={}",
                err.code()
            );
            SettingsResponse {
                ok: false,
                settings_json,
                root_changed: false,
                error_code: Some(err.code().to_string()),
                message: format!("Saved, but the new data path could not be opened: {err}"),
            }
        }
    }
}

fn settings_failure(code: &str, message: impl Into<String>) -> SettingsResponse {
    SettingsResponse {
        ok: false,
        settings_json: String::new(),
        root_changed: false,
        error_code: Some(code.to_string()),
        message: message.into(),
    }
}

fn data_dir_override() -> Option<PathBuf> {
    let raw = std::env::var(DATA_DIR_ENV).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn lock_runtime() -> MutexGuard<'static, Option<NotesRuntime>> {
    RUNTIME
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_subscriptions() -> MutexGuard<'static, Option<SubscriptionTable>> {
    SUBSCRIPTIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `f` with a client handle, without holding the runtime lock during
/// the store round-trip.
fn with_client<T>(
    f: impl FnOnce(&NotesClient) -> Result<T, StoreError>,
) -> Result<T, (String, String)> {
    let client = lock_runtime()
        .as_ref()
        .map(|runtime| runtime.manager.client())
        .ok_or_else(|| {
            (
                NOT_INITIALIZED.to_string(),
                "notes_init has not been called".to_string(),
            )
        })?;
    f(&client).map_err(|err| (err.code().to_string(), err.to_string()))
}

fn note_call(
    operation: &str,
    id: &str,
    message: &str,
    f: impl FnOnce(&NotesClient, NoteId) -> Result<Note, StoreError>,
) -> NoteResponse {
    let id = match parse_note_id(id) {
        Ok(id) => id,
        Err(err) => return NoteResponse::failure(INVALID_ID, format!("{operation} failed: {err}")),
    };
    match with_client(|client| f(client, id)) {
        Ok(note) => NoteResponse::success(message, note),
        Err((code, err)) => NoteResponse::failure(&code, format!("{operation} failed: {err}")),
    }
}

fn action_call(
    operation: &str,
    id: &str,
    f: impl FnOnce(&NotesClient, NoteId) -> Result<NotesActionResponse, StoreError>,
) -> NotesActionResponse {
    let id = match parse_note_id(id) {
        Ok(id) => id,
        Err(err) => {
            return NotesActionResponse::failure(INVALID_ID, format!("{operation} failed: {err}"))
        }
    };
    match with_client(|client| f(client, id)) {
        Ok(response) => response,
        Err((code, err)) => {
            NotesActionResponse::failure(&code, format!("{operation} failed: {err}"))
        }
    }
}

fn parse_note_id(raw: &str) -> Result<NoteId, String> {
    NoteId::parse_str(raw.trim()).map_err(|err| format!("invalid note id `{raw}`: {err}"))
}

fn to_note_item(note: Note) -> NoteItem {
    NoteItem {
        id: note.id.to_string(),
        title: note.title,
        content: note.content,
        created_at: note.created_at,
        updated_at: note.updated_at,
        is_hidden: note.is_hidden,
        is_pinned: note.is_pinned,
        position_x: note.position_x,
        position_y: note.position_y,
        width: note.width,
        height: note.height,
    }
}

fn to_search_item(hit: SearchHit) -> SearchItem {
    SearchItem {
        note: to_note_item(hit.note),
        title_match: hit.title_match,
        match_context: hit.match_context,
    }
}

fn to_trash_item(item: TrashedNote) -> TrashItem {
    TrashItem {
        note: to_note_item(item.note),
        deleted_at: item.deleted_at,
    }
}

fn to_change_item(event: ChangeEvent) -> ChangeItem {
    match event {
        ChangeEvent::NoteChanged { id, kind } => ChangeItem {
            kind: kind.as_str().to_string(),
            note_id: Some(id.to_string()),
            root: None,
        },
        ChangeEvent::Invalidated { root } => ChangeItem {
            kind: "invalidated".to_string(),
            note_id: None,
            root: Some(root.display().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, create_note, delete_note, get_note, get_notes, get_settings, init_logging,
        list_trash, notes_init, notes_shutdown, ping, poll_changes, restore_note, save_settings,
        search_notes, subscribe_changes, toggle_hidden, unhide_all, unsubscribe_changes,
        update_note, NoteGeometry,
    };
    use std::sync::Mutex;
    use tempfile::TempDir;

    // The runtime is process-global; runtime tests must not interleave.
    static RUNTIME_TESTS: Mutex<()> = Mutex::new(());

    fn serial() -> std::sync::MutexGuard<'static, ()> {
        RUNTIME_TESTS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn calls_before_init_report_not_initialized() {
        let _guard = serial();
        notes_shutdown();

        let response = get_notes(false);
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("not_initialized"));
        assert_eq!(subscribe_changes(), 0);
        assert!(!get_settings().ok);
    }

    #[test]
    fn note_lifecycle_through_envelopes() {
        let _guard = serial();
        let app_dir = TempDir::new().unwrap();
        let init = notes_init(app_dir.path().display().to_string());
        assert!(init.ok, "{}", init.message);
        let subscription = subscribe_changes();
        assert_ne!(subscription, 0);

        let created = create_note("Groceries".to_string(), "milk on the island".to_string());
        assert!(created.ok, "{}", created.message);
        let id = created.note.unwrap().id;

        let updated = update_note(
            id.clone(),
            None,
            Some("milk and bread".to_string()),
            Some(true),
            Some(NoteGeometry {
                position_x: 10.0,
                position_y: 20.0,
                width: 50.0,
                height: 500.0,
            }),
        );
        assert!(updated.ok, "{}", updated.message);
        let note = updated.note.unwrap();
        assert_eq!(note.title, "Groceries");
        assert!(note.is_pinned);
        assert_eq!(note.width, 120.0);

        let search = search_notes("BREAD".to_string(), false);
        assert_eq!(search.items.len(), 1);
        assert!(search.items[0].match_context.is_some());

        let hidden = toggle_hidden(id.clone());
        assert_eq!(hidden.is_hidden, Some(true));
        assert!(get_notes(false).items.is_empty());
        assert_eq!(unhide_all().affected, 1);

        assert!(delete_note(id.clone()).ok);
        let missing = get_note(id.clone());
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
        assert_eq!(list_trash().items.len(), 1);
        assert!(restore_note(id.clone()).ok);
        assert!(get_note(id.clone()).ok);

        let kinds = poll_changes(subscription)
            .into_iter()
            .map(|change| change.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                "created",
                "updated",
                "visibility_changed",
                "visibility_changed",
                "deleted",
                "restored"
            ]
        );
        assert!(unsubscribe_changes(subscription));
        assert!(!unsubscribe_changes(subscription));

        notes_shutdown();
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let _guard = serial();
        let app_dir = TempDir::new().unwrap();
        assert!(notes_init(app_dir.path().display().to_string()).ok);

        let response = get_note("not-a-uuid".to_string());
        assert_eq!(response.error_code.as_deref(), Some("invalid_id"));
        assert_eq!(
            delete_note(String::new()).error_code.as_deref(),
            Some("invalid_id")
        );

        notes_shutdown();
    }

    #[test]
    fn saving_a_new_data_path_switches_roots() {
        let _guard = serial();
        if std::env::var(super::DATA_DIR_ENV).is_ok() {
            return;
        }
        let app_dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        assert!(notes_init(app_dir.path().display().to_string()).ok);
        assert!(create_note("Old root".to_string(), String::new()).ok);
        let subscription = subscribe_changes();

        let updates = serde_json::json!({ "data_path": elsewhere.path() }).to_string();
        let saved = save_settings(updates);
        assert!(saved.ok, "{}", saved.message);
        assert!(saved.root_changed);
        assert!(get_notes(true).items.is_empty());
        let changes = poll_changes(subscription);
        assert_eq!(changes.last().unwrap().kind, "invalidated");

        let rejected = save_settings("[1, 2]".to_string());
        assert_eq!(rejected.error_code.as_deref(), Some("invalid_settings"));

        notes_shutdown();
    }
}
