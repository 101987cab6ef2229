//! File-backed persistence for the note collection and trash area.
//!
//! # Responsibility
//! - Resolve on-disk locations under one storage root.
//! - Read and atomically replace the collection file.
//! - Keep trashed notes as individual recoverable files.
//!
//! # Invariants
//! - A successful write is never partially visible: readers see the previous
//!   file or the new one.
//! - An unreadable collection file is moved aside, never deleted or overwritten.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

mod atomic;
pub mod collection;
pub mod trash;

pub use atomic::write_atomic;
pub use collection::{CollectionFile, LoadReport};
pub use trash::TrashArea;

pub const NOTES_FILE_NAME: &str = "notes.json";
pub const TRASH_DIR_NAME: &str = "trash";
const CORRUPT_SUFFIX: &str = "corrupt";

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    Encode(serde_json::Error),
    /// The collection could not be parsed and could not be moved aside either.
    Unrecoverable { path: PathBuf, source: io::Error },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error at `{}`: {source}", path.display()),
            Self::Encode(err) => write!(f, "failed to encode notes: {err}"),
            Self::Unrecoverable { path, source } => write!(
                f,
                "unreadable note collection at `{}` could not be preserved: {source}",
                path.display()
            ),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::Unrecoverable { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// On-disk locations derived from one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn notes_file(&self) -> PathBuf {
        self.root.join(NOTES_FILE_NAME)
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(TRASH_DIR_NAME)
    }

    /// Recovery location for an unreadable collection, stamped with `epoch_ms`.
    pub fn corrupt_file(&self, epoch_ms: i64) -> PathBuf {
        self.root
            .join(format!("{NOTES_FILE_NAME}.{CORRUPT_SUFFIX}-{epoch_ms}"))
    }

    /// Creates the root and trash directories when missing.
    pub fn ensure_dirs(&self) -> StorageResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|err| StorageError::io(&self.root, err))?;
        let trash = self.trash_dir();
        std::fs::create_dir_all(&trash).map_err(|err| StorageError::io(&trash, err))?;
        Ok(())
    }
}
