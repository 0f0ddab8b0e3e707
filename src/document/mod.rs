//! Document model consumed by the extraction engine.
//!
//! The engine never parses file formats itself. It reads pages through the
//! [`DocumentSource`] trait, which exposes positioned text tokens, structured
//! tables and, optionally, a rasterized image for OCR. [`Document`] is the
//! in-memory implementation used for JSON fixtures, spreadsheets and tests.

#[cfg(feature = "office")]
#[cfg_attr(docsrs, doc(cfg(feature = "office")))]
pub mod spreadsheet;

use crate::error::Result;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default line height used by the line-based constructors.
const SYNTHETIC_LINE_HEIGHT: f32 = 12.0;
/// Default line pitch used by the line-based constructors.
const SYNTHETIC_LINE_PITCH: f32 = 14.0;

/// A positioned piece of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    /// The token text
    pub text: String,
    /// Bounding box in page space (top-left origin)
    pub bbox: Rect,
}

impl TextToken {
    /// Create a token.
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A structured table: ordered rows of optional cell strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table rows, each an ordered list of cells
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create a table from rows of optional cells.
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Create a table from rows of plain strings; empty strings become `None`.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell = cell.as_ref().trim();
                        (!cell.is_empty()).then(|| cell.to_string())
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A rasterized page image (8-bit grayscale, row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data
    pub pixels: Vec<u8>,
}

/// Read-only access to a document's pages.
///
/// Implementations may be backed by a PDF parser, a spreadsheet reader or
/// plain memory. Page indices are physical, 0-based positions.
pub trait DocumentSource {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Positioned text tokens of a page.
    fn page_tokens(&self, page: usize) -> Result<Vec<TextToken>>;

    /// Structured tables of a page; empty when the layout exposes none.
    fn page_tables(&self, page: usize) -> Result<Vec<Table>>;

    /// Page size `(width, height)` in token coordinates, when known.
    fn page_size(&self, _page: usize) -> Option<(f32, f32)> {
        None
    }

    /// Rasterized page for OCR. Absence is never an error.
    fn page_image(&self, _page: usize) -> Option<PageImage> {
        None
    }
}

/// Best-effort text recognition for pages without a text layer.
pub trait OcrEngine {
    /// Recognize positioned tokens on a page image.
    fn recognize(&self, image: &PageImage) -> Result<Vec<TextToken>>;
}

/// A page of an in-memory document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Page width, when known
    #[serde(default)]
    pub width: Option<f32>,
    /// Page height, when known
    #[serde(default)]
    pub height: Option<f32>,
    /// Positioned text tokens
    #[serde(default)]
    pub tokens: Vec<TextToken>,
    /// Structured tables
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Page {
    /// Create an empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a page whose text is laid out one token per line, top to bottom.
    ///
    /// The page carries no size, so header and footer detection falls back
    /// to the first and last lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<TextToken> = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let text = line.as_ref();
                let width = text.chars().count() as f32 * 6.0;
                let bbox = Rect::new(
                    50.0,
                    40.0 + i as f32 * SYNTHETIC_LINE_PITCH,
                    width,
                    SYNTHETIC_LINE_HEIGHT,
                );
                TextToken::new(text, bbox)
            })
            .collect();
        Self {
            width: None,
            height: None,
            tokens,
            tables: Vec::new(),
        }
    }

    /// Attach a table to this page.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Append a token.
    pub fn push_token(&mut self, token: TextToken) {
        self.tokens.push(token);
    }
}

/// An in-memory document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Pages in physical order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a document from pages.
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Create a document from one text block per page (lines split on `\n`).
    pub fn from_text_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages = pages
            .into_iter()
            .map(|text| Page::from_lines(text.as_ref().lines()))
            .collect();
        Self { pages }
    }

    /// Parse a document from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON document file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn page(&self, page: usize) -> Result<&Page> {
        self.pages.get(page).ok_or_else(|| crate::error::Error::Unreadable {
            page,
            reason: format!("document has {} pages", self.pages.len()),
        })
    }
}

impl DocumentSource for Document {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_tokens(&self, page: usize) -> Result<Vec<TextToken>> {
        Ok(self.page(page)?.tokens.clone())
    }

    fn page_tables(&self, page: usize) -> Result<Vec<Table>> {
        Ok(self.page(page)?.tables.clone())
    }

    fn page_size(&self, page: usize) -> Option<(f32, f32)> {
        let page = self.pages.get(page)?;
        Some((page.width?, page.height?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_strings() {
        let table = Table::from_strings(vec![vec!["1", "Common Equity Tier 1", " 4,921 "], vec!["", "x", ""]]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][2].as_deref(), Some("4,921"));
        assert_eq!(table.rows[1][0], None);
    }

    #[test]
    fn test_page_from_lines_layout() {
        let page = Page::from_lines(["first", "second"]);
        assert_eq!(page.tokens.len(), 2);
        assert!(page.tokens[0].bbox.y < page.tokens[1].bbox.y);
        assert_eq!(page.height, None);
    }

    #[test]
    fn test_document_source_bounds() {
        let doc = Document::from_text_pages(["a\nb", "c"]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_tokens(0).unwrap().len(), 2);
        assert!(doc.page_tokens(5).is_err());
        assert!(doc.page_image(0).is_none());
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = r#"{
            "pages": [
                { "tokens": [ { "text": "in millions", "bbox": { "x": 0, "y": 0, "width": 60, "height": 10 } } ] },
                { "tables": [ { "rows": [ ["1", "CET1", "4,921"], [null, "x", null] ] } ] }
            ]
        }"#;
        let doc = Document::from_json_str(json).unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].tokens[0].text, "in millions");
        assert_eq!(doc.pages[1].tables[0].rows[1][0], None);
        assert_eq!(doc.page_size(0), None);
    }
}
