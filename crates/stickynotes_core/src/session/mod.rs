//! Display-surface sessions and their auto-save timers.
//!
//! # Responsibility
//! - Hold a surface's short-lived note copy and unsaved draft.
//! - Run per-surface auto-save that writes only real edits.
//! - Turn change events into redraw hints.
//!
//! # Invariants
//! - Auto-save stops when the surface closes and when the storage root
//!   changes.

pub mod autosave;
pub mod surface;

pub use autosave::{AutoSaveRegistry, AutoSaveTask, DEFAULT_AUTO_SAVE_INTERVAL};
pub use surface::{SurfaceRefresh, SurfaceSession};
