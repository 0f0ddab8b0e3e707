//! Physical to logical page number mapping.
//!
//! Reports print their own page numbers, which drift from physical page order
//! (cover pages, section breaks, unnumbered inserts). The map is read from the
//! header and footer band of every page; pages without a printed number are
//! physical-only and are located by extrapolating the dominant offset.

use super::PreparedPage;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Lines taken from each end of a page when its height is unknown or its
/// header and footer bands are empty.
const BAND_LINES_WITHOUT_HEIGHT: usize = 2;

lazy_static! {
    /// "Page 7", "page 7 of 120", "Page 7/120"
    static ref RE_PAGE_WORD: Regex =
        Regex::new(r"(?i)\bpage\s+(\d{1,4})(?:\s*(?:of|/)\s*\d{1,4})?\b").unwrap();

    /// A standalone number, optionally dash-decorated: "7", "- 7 -"
    static ref RE_STANDALONE: Regex =
        Regex::new(r"^\s*[-–]?\s*(\d{1,4})\s*[-–]?\s*$").unwrap();

    /// "7 | Pillar 3 Report" or "Pillar 3 Report | 7"
    static ref RE_PIPE_LEADING: Regex = Regex::new(r"^\s*(\d{1,4})\s*\|").unwrap();
    static ref RE_PIPE_TRAILING: Regex = Regex::new(r"\|\s*(\d{1,4})\s*$").unwrap();
}

/// Map from physical page index (0-based) to printed page number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageNumberMap {
    logical: BTreeMap<usize, u32>,
    page_count: usize,
}

impl PageNumberMap {
    /// Build the map from prepared pages.
    ///
    /// `band` is the fraction of page height treated as header or footer.
    pub fn build(pages: &[PreparedPage], band: f32) -> Self {
        let page_count = pages.len();
        let mut logical = BTreeMap::new();

        for page in pages {
            if let Some(number) = detect_page_number(page, band) {
                if is_plausible(number, page_count) {
                    logical.insert(page.index, number);
                }
            }
        }

        log::debug!(
            "Page number map: {} of {} pages carry a printed number",
            logical.len(),
            page_count
        );

        Self {
            logical,
            page_count,
        }
    }

    /// Build a map from explicit entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, u32)>, page_count: usize) -> Self {
        Self {
            logical: entries.into_iter().collect(),
            page_count,
        }
    }

    /// Printed number of a physical page, when detected.
    pub fn logical(&self, physical: usize) -> Option<u32> {
        self.logical.get(&physical).copied()
    }

    /// Number of pages with a detected printed number.
    pub fn len(&self) -> usize {
        self.logical.len()
    }

    /// True when no page carries a detectable number.
    pub fn is_empty(&self) -> bool {
        self.logical.is_empty()
    }

    /// Most frequent `logical - (physical + 1)` offset among mapped pages.
    ///
    /// Ties go to the smaller offset.
    pub fn dominant_offset(&self) -> Option<i64> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for (&physical, &logical) in &self.logical {
            *counts.entry(logical as i64 - (physical as i64 + 1)).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(offset, _)| offset)
    }

    /// Printed number of a page, or its extrapolation from the dominant offset.
    pub fn effective_logical(&self, physical: usize) -> i64 {
        match self.logical(physical) {
            Some(n) => n as i64,
            None => physical as i64 + 1 + self.dominant_offset().unwrap_or(0),
        }
    }

    /// Physical pages within `window` of a logical page, nearest first.
    ///
    /// At equal distance, the page after the target precedes the page before
    /// it: index entries usually point at the first page of a section.
    pub fn candidate_pages(&self, logical: u32, window: usize) -> Vec<usize> {
        let target = logical as i64;
        let window = window as i64;
        let mut candidates: Vec<(i64, i64, usize)> = (0..self.page_count)
            .filter_map(|physical| {
                let delta = self.effective_logical(physical) - target;
                (delta.abs() <= window).then_some((delta.abs(), -delta.signum(), physical))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().map(|(_, _, physical)| physical).collect()
    }
}

/// Reject numbers that cannot be page numbers of this document (years, totals).
pub(crate) fn is_plausible(number: u32, page_count: usize) -> bool {
    number >= 1 && (number as usize) <= page_count * 2 + 20
}

fn detect_page_number(page: &PreparedPage, band: f32) -> Option<u32> {
    let lines = &page.lines;
    if lines.is_empty() {
        return None;
    }

    // Footer first: most reports number pages at the bottom
    let mut band_lines: Vec<&str> = match page.height {
        Some(height) if height > 0.0 => {
            let header_limit = height * band;
            let footer_limit = height * (1.0 - band);
            lines
                .iter()
                .rev()
                .filter(|l| l.bbox.top() >= footer_limit)
                .chain(lines.iter().filter(|l| l.bbox.bottom() <= header_limit))
                .map(|l| l.text.as_str())
                .collect()
        },
        _ => Vec::new(),
    };

    if band_lines.is_empty() {
        let n = BAND_LINES_WITHOUT_HEIGHT.min(lines.len());
        band_lines = lines
            .iter()
            .rev()
            .take(n)
            .chain(lines.iter().take(n))
            .map(|l| l.text.as_str())
            .collect();
    }

    band_lines.into_iter().find_map(parse_page_marker)
}

/// Parse a header/footer line into a page number.
fn parse_page_marker(line: &str) -> Option<u32> {
    [&*RE_PAGE_WORD, &*RE_STANDALONE, &*RE_PIPE_LEADING, &*RE_PIPE_TRAILING]
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
