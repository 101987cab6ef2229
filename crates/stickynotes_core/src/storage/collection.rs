//! Collection file load/save with corruption recovery.
//!
//! # Invariants
//! - Load never fails because of unparseable content; it preserves the file
//!   under a `notes.json.corrupt-<epoch_ms>` name and reports an empty set.
//! - Save always serializes the full active collection.

use super::{write_atomic, StorageError, StoragePaths, StorageResult};
use crate::clock::now_epoch_ms;
use crate::model::note::Note;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;

const COLLECTION_VERSION: u32 = 1;

#[derive(Serialize)]
struct CollectionRef<'a> {
    version: u32,
    notes: &'a [Note],
}

/// Accepted on-disk shapes. Bare arrays are what older builds wrote.
#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionOnDisk {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        notes: Vec<Note>,
    },
    Bare(Vec<Note>),
}

/// Outcome of reading the collection file at open time.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub notes: Vec<Note>,
    /// Where an unreadable collection was preserved, if one was found.
    pub recovered_from: Option<PathBuf>,
}

/// The single collection file under a storage root.
#[derive(Debug, Clone)]
pub struct CollectionFile {
    paths: StoragePaths,
}

impl CollectionFile {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Reads the collection.
    ///
    /// Missing file → empty set. Unparseable file → moved aside, empty set.
    /// Returns an error only when the bytes cannot be read or preserved.
    pub fn load(&self) -> StorageResult<LoadReport> {
        let started_at = Instant::now();
        let path = self.paths.notes_file();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("event=collection_load module=storage status=ok notes=0 reason=missing");
                return Ok(LoadReport::default());
            }
            Err(err) => {
                error!(
                    "event=collection_load module=storage status=error error_code=read_failed error={}",
                    err
                );
                return Err(StorageError::io(&path, err));
            }
        };

        match serde_json::from_slice::<CollectionOnDisk>(&bytes) {
            Ok(parsed) => {
                let notes = repair(match parsed {
                    CollectionOnDisk::Versioned { notes, .. } => notes,
                    CollectionOnDisk::Bare(notes) => notes,
                });
                info!(
                    "event=collection_load module=storage status=ok notes={} duration_ms={}",
                    notes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(LoadReport {
                    notes,
                    recovered_from: None,
                })
            }
            Err(parse_err) => {
                let recovery = self.preserve_corrupt()?;
                warn!(
                    "event=collection_load module=storage status=recovered error_code=corrupt_store recovery_path={} error={}",
                    recovery.display(),
                    parse_err
                );
                Ok(LoadReport {
                    notes: Vec::new(),
                    recovered_from: Some(recovery),
                })
            }
        }
    }

    /// Serializes `notes` and atomically replaces the collection file.
    pub fn save(&self, notes: &[Note]) -> StorageResult<()> {
        let started_at = Instant::now();
        let bytes = serde_json::to_vec_pretty(&CollectionRef {
            version: COLLECTION_VERSION,
            notes,
        })?;

        match write_atomic(&self.paths.notes_file(), &bytes) {
            Ok(()) => {
                info!(
                    "event=collection_save module=storage status=ok notes={} bytes={} duration_ms={}",
                    notes.len(),
                    bytes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=collection_save module=storage status=error error_code=write_failed error={}",
                    err
                );
                Err(err)
            }
        }
    }

    fn preserve_corrupt(&self) -> StorageResult<PathBuf> {
        let source = self.paths.notes_file();
        let recovery = self.paths.corrupt_file(now_epoch_ms());

        if fs::rename(&source, &recovery).is_ok() {
            return Ok(recovery);
        }

        // Rename can fail across odd mounts; a byte copy still preserves the
        // original, but then the source must stay untouched too.
        match fs::copy(&source, &recovery) {
            Ok(_) => Ok(recovery),
            Err(err) => Err(StorageError::Unrecoverable {
                path: source,
                source: err,
            }),
        }
    }
}

/// Drops duplicate ids and fixes reversed timestamps from hand-edited files.
fn repair(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let mut repaired = Vec::with_capacity(notes.len());

    for mut note in notes {
        if !seen.insert(note.id) {
            warn!(
                "event=collection_repair module=storage status=skipped reason=duplicate_id note_id={}",
                note.id
            );
            continue;
        }
        if note.updated_at < note.created_at {
            note.updated_at = note.created_at;
        }
        repaired.push(note);
    }

    repaired
}
