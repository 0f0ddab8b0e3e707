//! Table of contents detection.
//!
//! Disclosure reports open with an index of templates: short lines ending in
//! page numbers, often padded with dot leaders (`EU KM1 Key metrics ....... 7`).
//! Pages dominated by such lines are classified as TOC pages and never used as
//! data pages, even though they mention every template by name.
//!
//! A data row printed in small units (`3 Total capital 61`) has the same shape
//! as a plain entry, so a page of plain entries only counts as a TOC when at
//! least one of them names a template.

use super::lines::TextLine;
use crate::numeric::scan_numeric_tokens;

/// Filler glyphs that form dot leaders.
const LEADER_CHARS: [char; 5] = ['.', '•', '․', '‥', '…'];
/// Longest line still considered a TOC entry without a dot leader.
const MAX_PLAIN_ENTRY_CHARS: usize = 90;

/// A detected table of contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// The entry title ("EU KM1 Key metrics")
    pub text: String,
    /// Trailing page number, if present
    pub page_number: Option<u32>,
    /// The title and page number are separated by a dot leader
    pub has_leader: bool,
}

/// TOC classifier configuration.
#[derive(Debug, Clone)]
pub struct TocClassifier {
    /// Minimum number of consecutive filler dots forming a leader (default: 3)
    pub min_dot_leader_length: usize,
    /// Minimum TOC-like lines to classify a page (default: 3)
    pub min_entries: usize,
    /// Minimum share of TOC-like lines on the page (default: 0.3)
    pub min_line_ratio: f32,
}

impl Default for TocClassifier {
    fn default() -> Self {
        Self {
            min_dot_leader_length: 3,
            min_entries: 3,
            min_line_ratio: 0.3,
        }
    }
}

impl TocClassifier {
    /// Create a new classifier with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the page's lines look like a table of contents.
    ///
    /// Without template knowledge, only dot leaders can vouch for a page.
    pub fn is_toc_page(&self, lines: &[TextLine]) -> bool {
        self.is_toc_page_with(lines, |_| false)
    }

    /// True when the page's lines look like a table of contents, where
    /// `names_template` tells whether an entry title names a known template.
    pub fn is_toc_page_with(&self, lines: &[TextLine], names_template: impl Fn(&str) -> bool) -> bool {
        if lines.is_empty() {
            return false;
        }
        let entries: Vec<TocEntry> = lines.iter().filter_map(|l| self.parse_entry(&l.text)).collect();
        if entries.len() < self.min_entries || (entries.len() as f32 / lines.len() as f32) < self.min_line_ratio {
            return false;
        }
        entries.iter().any(|e| e.has_leader || names_template(&e.text))
    }

    /// Parse a TOC-like line into its title and page number.
    ///
    /// Accepts dot-leader lines (`Title ........ 12`) and short lines whose only
    /// number is a trailing bare page number (`EU OV1 Overview of RWEA 14`).
    pub fn parse_entry(&self, line: &str) -> Option<TocEntry> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some((text_part, page_part)) = self.split_dot_leader(trimmed) {
            return Some(TocEntry {
                text: text_part,
                page_number: parse_page_number(&page_part),
                has_leader: true,
            });
        }

        if trimmed.chars().count() > MAX_PLAIN_ENTRY_CHARS {
            return None;
        }
        let tokens = scan_numeric_tokens(trimmed);
        let last = tokens.last()?;
        if last.end != trimmed.len() || !last.is_bare_small_integer() {
            return None;
        }
        // Only a leading section number may precede the page number
        let others = &tokens[..tokens.len() - 1];
        if others.len() > 1 || others.iter().any(|t| t.start != 0 || !t.is_bare_small_integer()) {
            return None;
        }
        let text = trimmed[..last.start].trim();
        if !text.chars().any(|c| c.is_alphabetic()) {
            return None;
        }
        Some(TocEntry {
            text: text.to_string(),
            page_number: last.text.parse().ok(),
            has_leader: false,
        })
    }

    /// Split a dot-leader line into title and trailing part.
    fn split_dot_leader(&self, text: &str) -> Option<(String, String)> {
        let mut run_start = None;
        let mut run_len = 0;
        let mut leader: Option<(usize, usize)> = None;

        for (i, c) in text.char_indices() {
            if LEADER_CHARS.contains(&c) {
                if run_len == 0 {
                    run_start = Some(i);
                }
                run_len += 1;
                if run_len >= self.min_dot_leader_length {
                    leader = run_start.map(|s| (s, i + c.len_utf8()));
                }
            } else if c.is_whitespace() && run_len > 0 {
                // Spaced leaders (". . . .") keep the run alive
                continue;
            } else {
                if leader.is_some() {
                    break;
                }
                run_len = 0;
                run_start = None;
            }
        }

        let (start, end) = leader?;
        let text_part = text[..start].trim();
        if text_part.is_empty() {
            return None;
        }
        Some((text_part.to_string(), text[end..].trim().to_string()))
    }
}

/// Parse a page number from the part after a leader ("45", "45 ").
fn parse_page_number(text: &str) -> Option<u32> {
    text.split_whitespace()
        .next()
        .and_then(|w| w.parse::<u32>().ok())
}
