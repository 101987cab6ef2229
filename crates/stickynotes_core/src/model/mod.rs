//! Domain model for notes and their trash entries.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level validation so rejected input never reaches storage.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Deletion moves a note to trash; it is never destroyed by core.

pub mod note;
pub mod trash;
