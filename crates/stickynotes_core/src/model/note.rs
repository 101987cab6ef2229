//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record shared by every surface.
//! - Define partial-update (`NotePatch`) and input validation rules.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `updated_at >= created_at` at all times.
//! - Geometry stored on a note is always finite and inside clamp bounds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a note, kept across trash/restore cycles.
pub type NoteId = Uuid;

/// Title shown for notes whose title is blank after trimming.
pub const UNTITLED_TITLE: &str = "Untitled";
/// Maximum accepted title length, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Maximum accepted content size, in UTF-8 bytes.
pub const MAX_CONTENT_BYTES: usize = 1024 * 1024;

pub const DEFAULT_POSITION_X: f64 = 100.0;
pub const DEFAULT_POSITION_Y: f64 = 100.0;
pub const DEFAULT_WIDTH: f64 = 300.0;
pub const DEFAULT_HEIGHT: f64 = 300.0;

const MIN_SIZE: f64 = 120.0;
const MAX_SIZE: f64 = 4000.0;
const POSITION_LIMIT: f64 = 10_000.0;

/// Canonical note record.
///
/// Timestamps are Unix epoch milliseconds. Geometry fields fall back to the
/// default floating-window rectangle when missing from persisted data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Markdown source. Opaque to core.
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default = "default_position_x")]
    pub position_x: f64,
    #[serde(default = "default_position_y")]
    pub position_y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
}

impl Note {
    /// Creates a visible, unpinned note with default geometry.
    ///
    /// Title and content are stored as given; callers validate first.
    pub fn new(id: NoteId, title: String, content: String, now_ms: i64) -> Self {
        Self {
            id,
            title,
            content,
            created_at: now_ms,
            updated_at: now_ms,
            is_hidden: false,
            is_pinned: false,
            position_x: DEFAULT_POSITION_X,
            position_y: DEFAULT_POSITION_Y,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Returns the current floating-window rectangle.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            position_x: self.position_x,
            position_y: self.position_y,
            width: self.width,
            height: self.height,
        }
    }

    /// Advances `updated_at` to `now_ms`, never moving it backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = self.updated_at.max(now_ms).max(self.created_at);
    }

    /// Applies every supplied patch field.
    ///
    /// Returns `true` when at least one stored value changed. Timestamps are
    /// left alone; the store decides when to advance them.
    pub fn apply(&mut self, patch: &NotePatch) -> bool {
        let mut changed = false;

        if let Some(title) = patch.title.as_ref() {
            if &self.title != title {
                self.title = title.clone();
                changed = true;
            }
        }
        if let Some(content) = patch.content.as_ref() {
            if &self.content != content {
                self.content = content.clone();
                changed = true;
            }
        }
        if let Some(pinned) = patch.is_pinned {
            if self.is_pinned != pinned {
                self.is_pinned = pinned;
                changed = true;
            }
        }
        if let Some(geometry) = patch.geometry {
            if self.geometry() != geometry {
                self.position_x = geometry.position_x;
                self.position_y = geometry.position_y;
                self.width = geometry.width;
                self.height = geometry.height;
                changed = true;
            }
        }

        changed
    }
}

/// Floating-window rectangle for a popped-out note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            position_x: DEFAULT_POSITION_X,
            position_y: DEFAULT_POSITION_Y,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl Geometry {
    /// Validates finiteness and clamps into accepted bounds.
    ///
    /// Sizes are clamped to `[120, 4000]` and positions to `[-10000, 10000]`.
    pub fn normalized(self) -> Result<Self, NoteValidationError> {
        let values = [self.position_x, self.position_y, self.width, self.height];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(NoteValidationError::NonFiniteGeometry);
        }

        Ok(Self {
            position_x: self.position_x.clamp(-POSITION_LIMIT, POSITION_LIMIT),
            position_y: self.position_y.clamp(-POSITION_LIMIT, POSITION_LIMIT),
            width: self.width.clamp(MIN_SIZE, MAX_SIZE),
            height: self.height.clamp(MIN_SIZE, MAX_SIZE),
        })
    }
}

/// Partial update request. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
    pub geometry: Option<Geometry>,
}

impl NotePatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = Some(pinned);
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.is_pinned.is_none()
            && self.geometry.is_none()
    }

    /// Returns a validated copy with normalized title and clamped geometry.
    pub fn normalized(&self) -> Result<Self, NoteValidationError> {
        let title = match self.title.as_deref() {
            Some(title) => Some(normalize_title(title)?),
            None => None,
        };
        if let Some(content) = self.content.as_deref() {
            validate_content(content)?;
        }
        let geometry = match self.geometry {
            Some(geometry) => Some(geometry.normalized()?),
            None => None,
        };

        Ok(Self {
            title,
            content: self.content.clone(),
            is_pinned: self.is_pinned,
            geometry,
        })
    }
}

/// Validation errors for caller-supplied note fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    TitleTooLong { chars: usize, max: usize },
    ContentTooLarge { bytes: usize, max: usize },
    NonFiniteGeometry,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleTooLong { chars, max } => {
                write!(f, "title has {chars} characters; maximum is {max}")
            }
            Self::ContentTooLarge { bytes, max } => {
                write!(f, "content is {bytes} bytes; maximum is {max}")
            }
            Self::NonFiniteGeometry => write!(f, "geometry values must be finite numbers"),
        }
    }
}

impl Error for NoteValidationError {}

/// Trims a title and substitutes the placeholder for blank input.
pub fn normalize_title(title: &str) -> Result<String, NoteValidationError> {
    let trimmed = title.trim();
    let chars = trimmed.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(NoteValidationError::TitleTooLong {
            chars,
            max: MAX_TITLE_CHARS,
        });
    }
    if trimmed.is_empty() {
        return Ok(UNTITLED_TITLE.to_string());
    }
    Ok(trimmed.to_string())
}

pub fn validate_content(content: &str) -> Result<(), NoteValidationError> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(NoteValidationError::ContentTooLarge {
            bytes: content.len(),
            max: MAX_CONTENT_BYTES,
        });
    }
    Ok(())
}

fn default_position_x() -> f64 {
    DEFAULT_POSITION_X
}

fn default_position_y() -> f64 {
    DEFAULT_POSITION_Y
}

fn default_width() -> f64 {
    DEFAULT_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::{normalize_title, Geometry, Note, NotePatch, NoteValidationError, UNTITLED_TITLE};
    use uuid::Uuid;

    #[test]
    fn blank_title_becomes_placeholder() {
        assert_eq!(normalize_title("   ").unwrap(), UNTITLED_TITLE);
        assert_eq!(normalize_title("  Groceries ").unwrap(), "Groceries");
    }

    #[test]
    fn geometry_is_clamped_and_rejects_nan() {
        let clamped = Geometry {
            position_x: -50_000.0,
            position_y: 20.0,
            width: 10.0,
            height: 9_000.0,
        }
        .normalized()
        .unwrap();
        assert_eq!(clamped.position_x, -10_000.0);
        assert_eq!(clamped.width, 120.0);
        assert_eq!(clamped.height, 4000.0);

        let err = Geometry {
            width: f64::NAN,
            ..Geometry::default()
        }
        .normalized()
        .unwrap_err();
        assert_eq!(err, NoteValidationError::NonFiniteGeometry);
    }

    #[test]
    fn apply_reports_no_change_for_identical_values() {
        let mut note = Note::new(Uuid::new_v4(), "a".into(), "b".into(), 10);
        assert!(!note.apply(&NotePatch::default().title("a").content("b")));
        assert!(note.apply(&NotePatch::default().pinned(true)));
        assert!(note.is_pinned);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut note = Note::new(Uuid::new_v4(), "a".into(), "b".into(), 1_000);
        note.touch(500);
        assert_eq!(note.updated_at, 1_000);
        note.touch(2_000);
        assert_eq!(note.updated_at, 2_000);
    }

    #[test]
    fn missing_geometry_fields_load_with_fallback() {
        let json = format!(
            r#"{{"id":"{}","title":"t","content":"c","created_at":1,"updated_at":2}}"#,
            Uuid::new_v4()
        );
        let note: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(note.geometry(), Geometry::default());
        assert!(!note.is_hidden);
    }
}
