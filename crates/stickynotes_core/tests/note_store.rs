use stickynotes_core::model::note::{MAX_TITLE_CHARS, UNTITLED_TITLE};
use stickynotes_core::storage::NOTES_FILE_NAME;
use stickynotes_core::{Geometry, NotePatch, NoteStore, NoteValidationError, StoreError};
use std::fs;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

fn open(dir: &TempDir) -> NoteStore {
    NoteStore::open(dir.path()).unwrap()
}

/// Makes the next collection write fail: renaming a file over a directory
/// is rejected by the OS.
fn block_collection_writes(root: &Path) {
    let path = root.join(NOTES_FILE_NAME);
    if path.exists() {
        fs::remove_file(&path).unwrap();
    }
    fs::create_dir(&path).unwrap();
}

#[test]
fn create_applies_defaults_and_persists() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);

    let note = store.create("  Groceries  ", "milk\neggs").unwrap();
    assert_eq!(note.title, "Groceries");
    assert_eq!(note.created_at, note.updated_at);
    assert!(!note.is_hidden);
    assert!(!note.is_pinned);
    assert_eq!(note.geometry(), Geometry::default());

    let reopened = open(&dir);
    assert_eq!(reopened.get(note.id).unwrap(), note);
}

#[test]
fn blank_title_becomes_untitled() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);

    let note = store.create("   ", "").unwrap();
    assert_eq!(note.title, UNTITLED_TITLE);
}

#[test]
fn oversized_title_is_rejected_without_writing() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);

    let err = store
        .create(&"x".repeat(MAX_TITLE_CHARS + 1), "")
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidInput(NoteValidationError::TitleTooLong { .. })
    ));
    assert!(store.list(true).is_empty());
    assert!(!dir.path().join(NOTES_FILE_NAME).exists());
}

#[test]
fn update_merges_only_supplied_fields() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Title", "body").unwrap();
    sleep(Duration::from_millis(2));

    let outcome = store
        .update(note.id, &NotePatch::default().content("new body"))
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.note.title, "Title");
    assert_eq!(outcome.note.content, "new body");
    assert!(outcome.note.updated_at > note.updated_at);
    assert_eq!(outcome.note.created_at, note.created_at);
}

#[test]
fn identical_update_is_a_no_op_without_disk_write() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Title", "body").unwrap();

    // Any write would now fail, so success proves nothing was written.
    block_collection_writes(dir.path());
    let outcome = store
        .update(note.id, &NotePatch::default().title("Title").content("body"))
        .unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.note.updated_at, note.updated_at);

    let empty = store.update(note.id, &NotePatch::default()).unwrap();
    assert!(!empty.changed);
}

#[test]
fn geometry_is_clamped_and_nan_rejected() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Sticky", "").unwrap();

    let outcome = store
        .update(
            note.id,
            &NotePatch::default().geometry(Geometry {
                position_x: -50_000.0,
                position_y: 40.0,
                width: 10.0,
                height: 9_000.0,
            }),
        )
        .unwrap();
    assert_eq!(outcome.note.position_x, -10_000.0);
    assert_eq!(outcome.note.position_y, 40.0);
    assert_eq!(outcome.note.width, 120.0);
    assert_eq!(outcome.note.height, 4_000.0);

    let err = store
        .update(
            note.id,
            &NotePatch::default().geometry(Geometry {
                position_x: f64::NAN,
                ..Geometry::default()
            }),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidInput(NoteValidationError::NonFiniteGeometry)
    ));
}

#[test]
fn list_orders_pinned_then_recent_and_filters_hidden() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let oldest = store.create("oldest", "").unwrap();
    sleep(Duration::from_millis(2));
    let middle = store.create("middle", "").unwrap();
    sleep(Duration::from_millis(2));
    let newest = store.create("newest", "").unwrap();

    store.set_pinned(oldest.id, true).unwrap();
    // Pinning touches `updated_at`; make `newest` the most recent again.
    sleep(Duration::from_millis(2));
    store
        .update(newest.id, &NotePatch::default().content("edited"))
        .unwrap();
    assert!(store.toggle_hidden(middle.id).unwrap());

    let visible = store.list(false);
    let ids = visible.iter().map(|note| note.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![oldest.id, newest.id]);

    let all = store.list(true);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, oldest.id);
}

#[test]
fn toggle_and_unhide_all_report_affected_notes() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let first = store.create("first", "").unwrap();
    let second = store.create("second", "").unwrap();
    store.create("third", "").unwrap();

    assert!(store.toggle_hidden(first.id).unwrap());
    assert!(store.toggle_hidden(second.id).unwrap());
    assert_eq!(store.list(false).len(), 1);

    let mut affected = store.unhide_all().unwrap();
    affected.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(affected, expected);
    assert_eq!(store.list(false).len(), 3);

    assert!(store.unhide_all().unwrap().is_empty());
}

#[test]
fn missing_ids_report_not_found() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let id = Uuid::new_v4();

    assert!(matches!(store.get(id), Err(StoreError::NotFound(found)) if found == id));
    assert!(matches!(
        store.update(id, &NotePatch::default().title("x")),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(store.toggle_hidden(id), Err(StoreError::NotFound(_))));
    assert!(matches!(store.delete(id), Err(StoreError::NotFound(_))));
    assert!(matches!(store.restore(id), Err(StoreError::NotFound(_))));
}

#[test]
fn delete_moves_note_to_trash_and_restore_brings_it_back() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Keep me", "content").unwrap();

    store.delete(note.id).unwrap();
    assert!(store.list(true).is_empty());
    let trash = store.list_trash();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].note.id, note.id);
    assert!(dir
        .path()
        .join("trash")
        .join(format!("{}.json", note.id))
        .exists());

    // Trash survives a restart.
    drop(store);
    let mut store = open(&dir);
    assert_eq!(store.list_trash().len(), 1);

    let restored = store.restore(note.id).unwrap();
    assert_eq!(restored.id, note.id);
    assert_eq!(restored.title, "Keep me");
    assert_eq!(restored.content, "content");
    assert!(store.list_trash().is_empty());
    assert_eq!(store.get(note.id).unwrap(), restored);
    assert!(!dir
        .path()
        .join("trash")
        .join(format!("{}.json", note.id))
        .exists());
}

#[test]
fn failed_write_rolls_back_every_mutation() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Stable", "body").unwrap();
    block_collection_writes(dir.path());

    assert!(matches!(
        store.create("new", ""),
        Err(StoreError::PersistenceFailure(_))
    ));
    assert!(matches!(
        store.update(note.id, &NotePatch::default().content("changed")),
        Err(StoreError::PersistenceFailure(_))
    ));
    assert!(matches!(
        store.toggle_hidden(note.id),
        Err(StoreError::PersistenceFailure(_))
    ));
    assert!(matches!(
        store.delete(note.id),
        Err(StoreError::PersistenceFailure(_))
    ));

    assert_eq!(store.list(true), vec![note.clone()]);
    assert!(store.list_trash().is_empty());
    assert!(!dir
        .path()
        .join("trash")
        .join(format!("{}.json", note.id))
        .exists());
}

#[test]
fn failed_unhide_all_keeps_notes_hidden() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Tucked away", "").unwrap();
    store.toggle_hidden(note.id).unwrap();
    let hidden = store.get(note.id).unwrap();
    block_collection_writes(dir.path());

    assert!(matches!(
        store.unhide_all(),
        Err(StoreError::PersistenceFailure(_))
    ));
    assert_eq!(store.get(note.id).unwrap(), hidden);
    assert!(store.list(false).is_empty());
}

#[test]
fn restore_keeps_the_note_in_trash_when_the_entry_cannot_be_removed() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let note = store.create("Stuck", "body").unwrap();
    store.delete(note.id).unwrap();

    // A non-empty directory in place of the entry cannot be removed as a file.
    let entry = dir.path().join("trash").join(format!("{}.json", note.id));
    fs::remove_file(&entry).unwrap();
    fs::create_dir(&entry).unwrap();
    fs::write(entry.join("keep"), b"x").unwrap();

    assert!(matches!(
        store.restore(note.id),
        Err(StoreError::PersistenceFailure(_))
    ));
    assert!(store.list(true).is_empty());
    assert!(matches!(store.get(note.id), Err(StoreError::NotFound(_))));
    let trashed = store.list_trash();
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].note.id, note.id);

    drop(store);
    let reopened = open(&dir);
    assert!(reopened.list(true).is_empty());
    assert!(entry.exists());
}

#[test]
fn reload_reproduces_the_active_set() {
    let dir = TempDir::new().unwrap();
    let mut store = open(&dir);
    let pinned = store.create("pinned", "a").unwrap();
    store.set_pinned(pinned.id, true).unwrap();
    let hidden = store.create("hidden", "b").unwrap();
    store.toggle_hidden(hidden.id).unwrap();
    store.create("plain", "c").unwrap();

    let before = store.list(true);
    drop(store);
    assert_eq!(open(&dir).list(true), before);
}

#[test]
fn corrupt_collection_is_preserved_and_store_starts_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(NOTES_FILE_NAME), b"{ not json").unwrap();

    let store = open(&dir);
    assert!(store.list(true).is_empty());
    let recovered = store.recovered_from().unwrap().to_path_buf();
    assert_eq!(fs::read(&recovered).unwrap(), b"{ not json");
    assert!(recovered
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("notes.json.corrupt-"));
}

#[test]
fn legacy_bare_array_and_missing_fields_load_with_defaults() {
    let dir = TempDir::new().unwrap();
    let id = Uuid::new_v4();
    fs::write(
        dir.path().join(NOTES_FILE_NAME),
        format!(
            r#"[{{ "id": "{id}", "title": "Old", "content": "x", "created_at": 10, "updated_at": 5 }}]"#
        ),
    )
    .unwrap();

    let store = open(&dir);
    let note = store.get(id).unwrap();
    assert_eq!(note.geometry(), Geometry::default());
    assert!(!note.is_hidden);
    assert!(note.updated_at >= note.created_at);
}
