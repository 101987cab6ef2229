//! Core domain logic for StickyNotes.
//! This crate is the single source of truth for note invariants; surfaces
//! (FFI, CLI) only ever go through `RootManager` and `NotesClient`.

pub mod clock;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod notify;
pub mod search;
pub mod service;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;

pub use lifecycle::{RootManager, RootSwitch};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::note::{Geometry, Note, NoteId, NotePatch, NoteValidationError};
pub use model::trash::TrashedNote;
pub use notify::{ChangeEvent, ChangeHub, ChangeKind, Subscription};
pub use search::matcher::{search_notes, SearchHit, SearchQuery};
pub use service::NotesClient;
pub use session::{AutoSaveRegistry, SurfaceRefresh, SurfaceSession};
pub use settings::{SettingsError, SettingsFile, UserSettings};
pub use storage::StorageError;
pub use store::{NoteStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Default log level for the current build profile.
pub fn default_log_level() -> &'static str {
    LogLevel::build_default().as_str()
}

#[cfg(test)]
mod tests {
    use super::{core_version, default_log_level, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_log_level_is_supported() {
        assert!(matches!(default_log_level(), "debug" | "info"));
    }
}
