//! Linear-scan substring search over a note snapshot.
//!
//! # Responsibility
//! - Match the query case-insensitively against title and content.
//! - Rank title hits above content-only hits.
//! - Cut a short content excerpt around the first hit for highlighting.
//!
//! # Invariants
//! - The query is matched literally; regex metacharacters have no meaning.
//! - Hidden notes never appear unless the query asks for them.
//! - Blank queries return the plain listing with no excerpts.

use crate::model::note::Note;
use crate::store::sort_for_listing;
use log::warn;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::ops::Range;

/// Characters kept before the first content hit.
const CONTEXT_CHARS_BEFORE: usize = 20;
/// Characters kept after the first content hit.
const CONTEXT_CHARS_AFTER: usize = 30;
const ELLIPSIS: &str = "...";

/// Search options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// User query text; surrounding whitespace is ignored.
    pub text: String,
    /// Whether hidden notes may appear in results.
    pub include_hidden: bool,
}

impl SearchQuery {
    /// Creates a query over visible notes only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            include_hidden: false,
        }
    }

    pub fn including_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub note: Note,
    /// Whether the title contained the query.
    pub title_match: bool,
    /// Excerpt of `content` around the first hit. `None` for title-only hits
    /// and for blank queries.
    pub match_context: Option<String>,
}

/// Searches `notes` and returns ranked hits.
pub fn search_notes(notes: &[Note], query: &SearchQuery) -> Vec<SearchHit> {
    let visible = notes
        .iter()
        .filter(|note| query.include_hidden || !note.is_hidden);

    let text = query.text.trim();
    if text.is_empty() {
        let mut listed = visible.cloned().collect::<Vec<_>>();
        sort_for_listing(&mut listed);
        return listed
            .into_iter()
            .map(|note| SearchHit {
                note,
                title_match: false,
                match_context: None,
            })
            .collect();
    }

    let Some(matcher) = build_matcher(text) else {
        return Vec::new();
    };

    let mut hits = visible
        .filter_map(|note| {
            let title_match = matcher.is_match(&note.title);
            let content_hit = matcher.find(&note.content).map(|found| found.range());
            if !title_match && content_hit.is_none() {
                return None;
            }
            Some(SearchHit {
                note: note.clone(),
                title_match,
                match_context: content_hit.map(|range| excerpt(&note.content, range)),
            })
        })
        .collect::<Vec<_>>();

    hits.sort_by(|a, b| {
        b.title_match
            .cmp(&a.title_match)
            .then_with(|| b.note.updated_at.cmp(&a.note.updated_at))
            .then_with(|| a.note.id.cmp(&b.note.id))
    });
    hits
}

fn build_matcher(text: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(text))
        .case_insensitive(true)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(
                "event=search module=search status=error error_code=matcher_build_failed query_chars={} error={}",
                text.chars().count(),
                err
            );
            None
        }
    }
}

/// Cuts `content` around `hit` on char boundaries and folds line breaks.
fn excerpt(content: &str, hit: Range<usize>) -> String {
    let start = content[..hit.start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS_BEFORE.saturating_sub(1))
        .map(|(index, _)| index)
        .unwrap_or(0);
    let end = content[hit.end..]
        .char_indices()
        .nth(CONTEXT_CHARS_AFTER)
        .map(|(index, _)| hit.end + index)
        .unwrap_or(content.len());

    let mut snippet = String::with_capacity(end - start + 2 * ELLIPSIS.len());
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(content[start..end].chars().map(|ch| match ch {
        '\n' | '\r' | '\t' => ' ',
        other => other,
    }));
    if end < content.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::excerpt;

    #[test]
    fn excerpt_keeps_short_content_whole() {
        let content = "a small island";
        let start = content.find("island").unwrap();
        assert_eq!(excerpt(content, start..start + 6), "a small island");
    }

    #[test]
    fn excerpt_truncates_both_sides_on_char_boundaries() {
        let content = format!("{}needle{}", "é".repeat(40), "ü".repeat(40));
        let start = content.find("needle").unwrap();
        let snippet = excerpt(&content, start..start + 6);

        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("needle"));
        assert_eq!(snippet.matches('é').count(), 20);
        assert_eq!(snippet.matches('ü').count(), 30);
    }

    #[test]
    fn excerpt_folds_line_breaks() {
        let content = "line one\nthe target\nline three";
        let start = content.find("target").unwrap();
        assert!(!excerpt(content, start..start + 6).contains('\n'));
    }
}
