//! Spreadsheet documents (XLSX, XLS, ODS).
//!
//! Each worksheet becomes one page holding a single table. A text line per
//! row is synthesized as well, so the text-based extractor can run on
//! spreadsheets whose cells merge identifier and label.
//!
//! Uses the calamine crate for reading workbooks.

use super::{Document, Page, Table, TextToken};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use std::path::Path;

const ROW_PITCH: f32 = 14.0;
const ROW_HEIGHT: f32 = 12.0;

/// Loader turning workbooks into in-memory documents.
pub struct SpreadsheetLoader;

impl SpreadsheetLoader {
    /// Load a workbook from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Load a workbook from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Document> {
        let cursor = Cursor::new(bytes);
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::Spreadsheet(format!("Failed to open workbook: {}", e)))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(Error::Spreadsheet("No sheets found in workbook".to_string()));
        }

        let mut pages = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            match workbook.worksheet_range(name) {
                Ok(range) => pages.push(sheet_to_page(name, &range)),
                Err(e) => {
                    log::warn!("Skipping unreadable sheet '{}': {}", name, e);
                    pages.push(Page::new());
                },
            }
        }

        Ok(Document::new(pages))
    }
}

fn sheet_to_page(name: &str, range: &Range<Data>) -> Page {
    let table = Table::new(
        range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect(),
    );

    let mut page = Page::new();
    page.push_token(TextToken::new(name, Rect::new(0.0, 0.0, 200.0, ROW_HEIGHT)));
    for (i, row) in table.rows.iter().enumerate() {
        let line = row
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if line.is_empty() {
            continue;
        }
        let y = (i + 1) as f32 * ROW_PITCH;
        page.push_token(TextToken::new(line, Rect::new(0.0, y, 500.0, ROW_HEIGHT)));
    }
    page.tables.push(table);
    page
}

/// Convert a cell value to an optional string.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        },
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(float_to_cell(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::Error(_) => None,
        other => Some(other.to_string()),
    }
}

/// Render a float so the normalizer cannot read its decimal point as a
/// thousands separator (`4.921` would parse as 4921).
fn float_to_cell(value: f64) -> String {
    let mut text = value.to_string();
    if text.split_once('.').is_some_and(|(_, frac)| frac.len() == 3) {
        text.push('0');
    }
    text
}
