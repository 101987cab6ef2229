//! Authoritative in-memory note collection.
//!
//! # Responsibility
//! - Own every mutation of the active set and the trash.
//! - Persist the full collection after each accepted mutation.
//!
//! # Invariants
//! - In-memory state only changes after the durable write succeeded.
//! - A note id is never present in both the active set and the trash.
//! - No-op updates neither advance `updated_at` nor touch the disk.

use crate::model::note::{NoteId, NoteValidationError};
use crate::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod note_store;

pub use note_store::{sort_for_listing, NoteStore, UpdateOutcome};

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed outcome for every failed store request.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced id is not in the active set (or the trash, for restore).
    NotFound(NoteId),
    /// Caller-supplied field values were rejected.
    InvalidInput(NoteValidationError),
    /// The durable write failed; the mutation was rolled back.
    PersistenceFailure(StorageError),
    /// The storage root could not be opened at all.
    Storage(StorageError),
    /// The store worker is no longer running.
    StoreUnavailable,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::PersistenceFailure(err) => write!(f, "failed to persist notes: {err}"),
            Self::Storage(err) => write!(f, "storage unavailable: {err}"),
            Self::StoreUnavailable => write!(f, "note store is not running"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::PersistenceFailure(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) | Self::StoreUnavailable => None,
        }
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl StoreError {
    /// Stable machine-readable code for FFI/CLI envelopes and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::Storage(_) => "storage_unavailable",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}
