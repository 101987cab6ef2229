use stickynotes_core::{NotePatch, RootManager, SurfaceRefresh};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn auto_save_writes_dirty_drafts_only() {
    let dir = TempDir::new().unwrap();
    let manager = RootManager::open(dir.path()).unwrap();
    let mut surface = manager.connect_surface();
    let note = manager.client().create_note("Draft", "first").unwrap();
    surface.open_note(note.id).unwrap();
    let events = manager.client().subscribe();

    surface.start_auto_save(Duration::from_millis(20)).unwrap();
    sleep(Duration::from_millis(80));
    // Clean drafts never reach the store.
    assert!(events.try_next().is_none());

    surface.edit(None, Some("second".to_string()));
    let client = manager.client();
    assert!(wait_until(|| client.get_note(note.id).unwrap().content == "second"));
    assert!(wait_until(|| !surface.has_unsaved_changes()));

    surface.stop_auto_save();
    assert!(!surface.auto_save_running());
}

#[test]
fn close_flushes_the_draft_and_stops_auto_save() {
    let dir = TempDir::new().unwrap();
    let manager = RootManager::open(dir.path()).unwrap();
    let mut surface = manager.connect_surface();
    let note = manager.client().create_note("Closing", "").unwrap();
    surface.open_note(note.id).unwrap();
    surface.start_auto_save(Duration::from_secs(60)).unwrap();
    surface.edit(Some("Closed".to_string()), None);

    surface.close().unwrap();

    assert_eq!(manager.auto_saves().active_count(), 0);
    assert_eq!(manager.client().get_note(note.id).unwrap().title, "Closed");
}

#[test]
fn remote_changes_reload_a_clean_draft() {
    let dir = TempDir::new().unwrap();
    let manager = RootManager::open(dir.path()).unwrap();
    let mut surface = manager.connect_surface();
    let other = manager.client();
    let note = other.create_note("Shared", "v1").unwrap();
    surface.open_note(note.id).unwrap();
    surface.process_changes();

    other
        .update_note(note.id, NotePatch::default().content("v2"))
        .unwrap();

    assert_eq!(
        surface.process_changes(),
        vec![SurfaceRefresh::ReloadNote(note.id)]
    );
    assert_eq!(surface.draft().1, "v2");
}

#[test]
fn unsaved_draft_is_not_overwritten_by_remote_changes() {
    let dir = TempDir::new().unwrap();
    let manager = RootManager::open(dir.path()).unwrap();
    let mut surface = manager.connect_surface();
    let other = manager.client();
    let note = other.create_note("Shared", "v1").unwrap();
    surface.open_note(note.id).unwrap();
    surface.process_changes();
    surface.edit(None, Some("local".to_string()));

    other
        .update_note(note.id, NotePatch::default().content("remote"))
        .unwrap();

    assert!(surface.process_changes().is_empty());
    assert_eq!(surface.draft().1, "local");

    // Last write wins.
    surface.save_now().unwrap();
    assert_eq!(other.get_note(note.id).unwrap().content, "local");
}

#[test]
fn deletion_elsewhere_closes_the_open_note() {
    let dir = TempDir::new().unwrap();
    let manager = RootManager::open(dir.path()).unwrap();
    let mut surface = manager.connect_surface();
    let other = manager.client();
    let note = other.create_note("Doomed", "").unwrap();
    surface.open_note(note.id).unwrap();
    surface.process_changes();

    other.delete_note(note.id).unwrap();

    assert_eq!(
        surface.process_changes(),
        vec![
            SurfaceRefresh::ReloadList,
            SurfaceRefresh::NoteClosed(note.id)
        ]
    );
    assert_eq!(surface.open_note_id(), None);
}

#[test]
fn root_switch_invalidates_every_surface() {
    let old_root = TempDir::new().unwrap();
    let new_root = TempDir::new().unwrap();
    let mut manager = RootManager::open(old_root.path()).unwrap();
    let mut surface = manager.connect_surface();
    let note = manager.client().create_note("Old", "").unwrap();
    surface.open_note(note.id).unwrap();
    surface.process_changes();
    surface.start_auto_save(Duration::from_secs(60)).unwrap();

    manager.switch_root(new_root.path()).unwrap();

    assert_eq!(surface.process_changes(), vec![SurfaceRefresh::ReloadAll]);
    assert_eq!(surface.open_note_id(), None);
    assert!(!surface.auto_save_running());
    assert!(surface.client().get_notes(true).unwrap().is_empty());
}
