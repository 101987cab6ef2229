//! Trash area: one JSON file per deleted note under `<root>/trash/`.
//!
//! # Invariants
//! - File name is `<note id>.json`; the id inside must match.
//! - Unreadable entries are skipped on load and left on disk.

use super::{write_atomic, StorageError, StoragePaths, StorageResult};
use crate::model::note::NoteId;
use crate::model::trash::TrashedNote;
use log::{info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct TrashArea {
    dir: PathBuf,
}

impl TrashArea {
    pub fn new(paths: &StoragePaths) -> Self {
        Self {
            dir: paths.trash_dir(),
        }
    }

    fn entry_path(&self, id: NoteId) -> PathBuf {
        self.dir.join(format!("{id}.{ENTRY_EXTENSION}"))
    }

    /// Reads every readable trash entry.
    pub fn load(&self) -> StorageResult<Vec<TrashedNote>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::io(&self.dir, err)),
        };

        let mut trashed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StorageError::io(&self.dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(file_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                continue;
            };

            let parsed = fs::read(&path)
                .map_err(|err| err.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<TrashedNote>(&bytes).map_err(|err| err.to_string())
                });
            match parsed {
                Ok(item) if item.note.id == file_id => trashed.push(item),
                Ok(_) => warn!(
                    "event=trash_load module=storage status=skipped reason=id_mismatch file_id={}",
                    file_id
                ),
                Err(err) => warn!(
                    "event=trash_load module=storage status=skipped reason=unreadable file_id={} error={}",
                    file_id, err
                ),
            }
        }

        info!(
            "event=trash_load module=storage status=ok entries={}",
            trashed.len()
        );
        Ok(trashed)
    }

    /// Durably writes one trash entry.
    pub fn put(&self, item: &TrashedNote) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| StorageError::io(&self.dir, err))?;
        let bytes = serde_json::to_vec_pretty(item)?;
        write_atomic(&self.entry_path(item.note.id), &bytes)
    }

    /// Removes one trash entry. A missing entry counts as removed.
    pub fn remove(&self, id: NoteId) -> StorageResult<()> {
        let path = self.entry_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io(path, err)),
        }
    }
}
