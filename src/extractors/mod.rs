//! Row extraction from candidate pages.
//!
//! Two strategies produce the same intermediate record, [`RawRowMatch`]:
//! - [`TableExtractor`] reads structured tables cell by cell
//! - [`TextExtractor`] scans reconstructed lines with fuzzy row matchers
//!
//! The arbiter decides which result a template keeps.

pub mod columns;
pub mod matcher;
pub mod table;
pub mod text;

pub use columns::{DimensionSplitter, SplitterState};
pub use matcher::{CompiledTemplate, LabelFit, LabelScore, LineMatch, RowMatcher};
pub use table::TableExtractor;
pub use text::TextExtractor;

use crate::catalog::Dimension;
use crate::layout::PreparedPage;
use serde::Serialize;
use std::fmt;

/// Strategy that produced a row match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// Structured table cells
    Table,
    /// Reconstructed text lines
    Text,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::Table => f.write_str("table"),
            ExtractionStrategy::Text => f.write_str("text"),
        }
    }
}

/// A template row located on a page, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRowMatch {
    /// Template code
    pub template_code: String,
    /// Canonical row identifier
    pub row_id: String,
    /// Label text that confirmed the row, when one did
    pub label_matched: Option<String>,
    /// The line or joined table row the match came from
    pub raw_text: String,
    /// The numeric string taken as the value
    pub numeric_string: String,
    /// Physical page index
    pub source_page: usize,
    /// Dimension for multi-dimension templates
    pub dimension: Option<Dimension>,
    /// Strategy that produced the match
    pub strategy: ExtractionStrategy,
}

/// A strategy for pulling template rows out of candidate pages.
pub trait RowExtractor {
    /// The strategy implemented.
    fn strategy(&self) -> ExtractionStrategy;

    /// Extract rows of `template` from `pages`, in page order.
    ///
    /// The first sighting of a `(row_id, dimension)` pair wins.
    fn extract(&self, template: &CompiledTemplate, pages: &[&PreparedPage]) -> Vec<RawRowMatch>;
}

/// A small parenthesized integer such as `(1)`: a footnote, not a negative value.
pub(crate) fn is_footnote_marker(text: &str) -> bool {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .is_some_and(|inner| !inner.is_empty() && inner.len() <= 2 && inner.chars().all(|c| c.is_ascii_digit()))
}

/// Keeps the first match per `(row_id, dimension)`.
#[derive(Debug, Default)]
pub(crate) struct FirstSighting {
    seen: std::collections::HashSet<(String, Option<Dimension>)>,
}

impl FirstSighting {
    /// Record a match; false when its key was already taken.
    pub(crate) fn admit(&mut self, row: &RawRowMatch) -> bool {
        self.seen.insert((row.row_id.clone(), row.dimension))
    }
}
