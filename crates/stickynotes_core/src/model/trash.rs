//! Trash entry model.

use crate::model::note::Note;
use serde::{Deserialize, Serialize};

/// A deleted note held for recovery, with its deletion time in epoch ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashedNote {
    pub note: Note,
    pub deleted_at: i64,
}
