//! Layout analysis for disclosure documents.
//!
//! This module turns positioned tokens into the structure the extractors need:
//! - Line reconstruction (tokens → reading-order lines)
//! - Table of contents classification
//! - Physical to logical page number mapping
//! - Front-matter template index ([`LayoutIndex`])

pub mod lines;
pub mod locator;
pub mod page_numbers;
pub mod toc;

// Re-export main types
pub use lines::{reconstruct_lines, TextLine};
pub use locator::{LayoutIndex, LayoutLocator, LayoutReport};
pub use page_numbers::PageNumberMap;
pub use toc::{TocClassifier, TocEntry};

use crate::document::{Table, TextToken};

/// A page with its lines reconstructed, ready for analysis and extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPage {
    /// Physical page index (0-based)
    pub index: usize,
    /// Page height, when the source reports it
    pub height: Option<f32>,
    /// Lines in reading order, top to bottom
    pub lines: Vec<TextLine>,
    /// Structured tables exposed by the source
    pub tables: Vec<Table>,
    /// Page was classified as a table of contents
    pub is_toc: bool,
}

impl PreparedPage {
    /// Reconstruct lines from `tokens` and wrap them with the page's tables.
    pub fn new(index: usize, tokens: &[TextToken], tables: Vec<Table>, height: Option<f32>) -> Self {
        Self {
            index,
            height,
            lines: reconstruct_lines(tokens),
            tables,
            is_toc: false,
        }
    }

    /// Page text, one line per row.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
