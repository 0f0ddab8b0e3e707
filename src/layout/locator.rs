//! Front-matter template index.
//!
//! Disclosure reports list their templates near the front, either as a
//! formal table of contents or as a section overview: `EU KM1 Key metrics ... 7`.
//! The locator reads those lines into a [`LayoutIndex`] mapping template codes
//! to printed page numbers, classifies TOC pages, and builds the page number
//! map used to translate printed numbers back to physical pages.

use super::page_numbers::{is_plausible, PageNumberMap};
use super::lines::TextLine;
use super::toc::TocClassifier;
use super::PreparedPage;
use crate::catalog::{normalize_label, TemplateCatalog};
use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::numeric::scan_numeric_tokens;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

lazy_static! {
    /// Trailing page number: a short integer at the end of the line, not part
    /// of a decimal ("15.2") but allowed directly after a dot leader ("..7").
    static ref RE_TRAILING_PAGE: Regex =
        Regex::new(r"(?:^|[^\w.,]|\.\.)(\d{1,4})\s*$").unwrap();
}

/// Vocabulary that only shows up on data pages.
const BODY_KEYWORDS: &[&str] = &[
    "cet1",
    "common equity tier",
    "risk exposure amount",
    "rwea",
    "own funds",
    "capital ratio",
    "leverage ratio",
    "exposure measure",
    "weighted value",
    "total",
];

/// Template code → logical page number, in order of first sighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutIndex {
    entries: IndexMap<String, u32>,
}

impl LayoutIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. The first sighting of a code wins; returns whether
    /// the entry was recorded.
    pub fn insert(&mut self, code: impl Into<String>, page: u32) -> bool {
        let code = code.into();
        if self.entries.contains_key(&code) {
            return false;
        }
        self.entries.insert(code, page);
        true
    }

    /// Logical page of a template.
    pub fn get(&self, code: &str) -> Option<u32> {
        self.entries.get(code).copied()
    }

    /// Number of indexed templates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no index was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order of first sighting.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(code, &page)| (code.as_str(), page))
    }
}

/// Everything the locator learned about a document's layout.
#[derive(Debug, Clone, Default)]
pub struct LayoutReport {
    /// Front-matter template index
    pub index: LayoutIndex,
    /// Physical to logical page numbers
    pub page_map: PageNumberMap,
    /// Physical indices of TOC pages
    pub toc_pages: BTreeSet<usize>,
}

impl LayoutReport {
    /// True when `page` was classified as a TOC page.
    pub fn is_toc(&self, page: usize) -> bool {
        self.toc_pages.contains(&page)
    }

    /// Physical candidate pages for an indexed template, nearest first,
    /// TOC pages excluded. `None` when the template is not indexed.
    pub fn indexed_candidates(&self, code: &str, window: usize) -> Option<Vec<usize>> {
        let logical = self.index.get(code)?;
        Some(
            self.page_map
                .candidate_pages(logical, window)
                .into_iter()
                .filter(|p| !self.is_toc(*p))
                .collect(),
        )
    }
}

/// Scans front matter for the template index.
#[derive(Debug, Clone)]
pub struct LayoutLocator {
    code_pattern: Regex,
    codes: HashMap<String, String>,
    aliases: Vec<(String, String)>,
    toc: TocClassifier,
    front_matter_pages: usize,
    header_footer_band: f32,
}

impl LayoutLocator {
    /// Build a locator for the templates of `catalog`.
    pub fn new(catalog: &TemplateCatalog, config: &ExtractionConfig) -> Result<Self> {
        let mut codes: Vec<&str> = catalog.codes().collect();
        // Longest first so "IRRBB1" wins over any shorter code it contains
        codes.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = codes
            .iter()
            .map(|c| regex::escape(c))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = if alternation.is_empty() {
            // Matches nothing
            r"[^\s\S]".to_string()
        } else {
            format!(r"(?i)(?:^|[^\w])(?:EU[\s\-]?)?({})(?:[^\w]|$)", alternation)
        };

        Ok(Self {
            code_pattern: Regex::new(&pattern)?,
            codes: catalog
                .codes()
                .map(|c| (c.to_uppercase(), c.to_string()))
                .collect(),
            aliases: catalog.alias_table(),
            toc: TocClassifier {
                min_dot_leader_length: config.min_dot_leader,
                min_entries: config.min_toc_entries,
                min_line_ratio: config.toc_line_ratio,
            },
            front_matter_pages: config.front_matter_pages,
            header_footer_band: config.header_footer_band,
        })
    }

    /// Analyze a document: index, TOC pages and page number map.
    ///
    /// TOC pages are flagged on `pages` so the extractors skip them.
    pub fn locate(&self, pages: &mut [PreparedPage]) -> LayoutReport {
        let page_count = pages.len();
        let front = self.front_matter_pages.min(page_count);
        let mut index = LayoutIndex::new();
        let mut toc_pages = BTreeSet::new();

        for page in pages[..front].iter_mut() {
            if self.is_toc_page(&page.lines) {
                page.is_toc = true;
                toc_pages.insert(page.index);
            }
            for line in &page.lines {
                if let Some((code, logical)) = self.scan_index_line(&line.text) {
                    if !is_plausible(logical, page_count) {
                        log::trace!("Ignoring index entry {} -> {}: implausible page", code, logical);
                        continue;
                    }
                    if index.insert(code.clone(), logical) {
                        log::debug!("Index entry {} -> page {} (physical {})", code, logical, page.index);
                    }
                }
            }
        }

        let page_map = PageNumberMap::build(pages, self.header_footer_band);

        log::debug!(
            "Layout: {} indexed templates, {} TOC pages, {} numbered pages",
            index.len(),
            toc_pages.len(),
            page_map.len()
        );

        LayoutReport {
            index,
            page_map,
            toc_pages,
        }
    }

    /// True when `lines` form a table of contents. Plain entries must name
    /// at least one catalog template.
    pub fn is_toc_page(&self, lines: &[TextLine]) -> bool {
        self.toc
            .is_toc_page_with(lines, |title| !self.find_template_mentions(title).is_empty())
    }

    /// Read one front-matter line as an index entry `(template code, logical page)`.
    ///
    /// The code (or an alias) must precede a trailing page number on the same
    /// line. Lines that look like body content are rejected.
    pub fn scan_index_line(&self, line: &str) -> Option<(String, u32)> {
        let caps = RE_TRAILING_PAGE.captures(line)?;
        let number = caps.get(1)?;
        let logical: u32 = number.as_str().parse().ok()?;
        if is_body_content(line) {
            return None;
        }

        let head = &line[..number.start()];
        if let Some(code) = self.first_code(head) {
            return Some((code, logical));
        }

        let normalized = format!(" {} ", normalize_label(head));
        self.aliases
            .iter()
            .find(|(alias, _)| normalized.contains(&format!(" {} ", alias)))
            .map(|(_, code)| (code.clone(), logical))
    }

    /// Catalog codes and aliases mentioned on a line, in order of first mention.
    pub fn find_template_mentions(&self, line: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for caps in self.code_pattern.captures_iter(line) {
            if let Some(code) = caps.get(1).and_then(|m| self.codes.get(&m.as_str().to_uppercase())) {
                if !found.contains(code) {
                    found.push(code.clone());
                }
            }
        }

        let normalized = format!(" {} ", normalize_label(line));
        for (alias, code) in &self.aliases {
            if !found.contains(code) && normalized.contains(&format!(" {} ", alias)) {
                found.push(code.clone());
            }
        }
        found
    }

    fn first_code(&self, text: &str) -> Option<String> {
        self.code_pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| self.codes.get(&m.as_str().to_uppercase()))
            .cloned()
    }
}

/// True when a line reads like a data row rather than an index entry.
pub fn is_body_content(line: &str) -> bool {
    let tokens = scan_numeric_tokens(line);
    if tokens.iter().any(|t| t.is_percent) {
        return true;
    }
    if tokens.iter().filter(|t| t.has_separator).count() >= 2 {
        return true;
    }
    let lower = line.to_lowercase();
    let keywords = BODY_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    keywords >= 2 && tokens.len() >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Page;

    fn locator() -> LayoutLocator {
        LayoutLocator::new(&TemplateCatalog::builtin(), &ExtractionConfig::default()).unwrap()
    }

    fn prepared(index: usize, lines: &[&str]) -> PreparedPage {
        let page = Page::from_lines(lines.iter().copied());
        PreparedPage::new(index, &page.tokens, Vec::new(), page.height)
    }

    #[test]
    fn test_scan_code_with_leader() {
        let locator = locator();
        assert_eq!(
            locator.scan_index_line("EU KM1 Key metrics ........ 7"),
            Some(("KM1".to_string(), 7))
        );
        assert_eq!(locator.scan_index_line("EU KM1 ... 2"), Some(("KM1".to_string(), 2)));
        assert_eq!(locator.scan_index_line("EU-OV1 Overview.....14"), Some(("OV1".to_string(), 14)));
    }

    #[test]
    fn test_scan_alias() {
        let locator = locator();
        assert_eq!(
            locator.scan_index_line("Quantitative information of LCR 21"),
            Some(("LIQ1".to_string(), 21))
        );
    }

    #[test]
    fn test_scan_rejects_body_and_code_digits() {
        let locator = locator();
        // The "1" of KM1 is part of the code, not a page number
        assert_eq!(locator.scan_index_line("EU KM1"), None);
        assert_eq!(locator.scan_index_line("EU KM1 CET1 ratio 15.2%"), None);
        assert_eq!(locator.scan_index_line("KM1 Total capital 4,921 5,010"), None);
        assert_eq!(locator.scan_index_line("Leverage ratio 5.2"), None);
    }

    #[test]
    fn test_find_template_mentions() {
        let locator = locator();
        assert_eq!(locator.find_template_mentions("Template EU KM1: Key metrics"), vec!["KM1"]);
        assert_eq!(
            locator.find_template_mentions("EU LIQ1 and EU LR2"),
            vec!["LIQ1".to_string(), "LR2".to_string()]
        );
        assert!(locator.find_template_mentions("EUKM12 Annex").is_empty());
    }

    #[test]
    fn test_locate_flags_toc_and_indexes() {
        let locator = locator();
        let mut pages = vec![
            prepared(
                0,
                &[
                    "Contents",
                    "EU KM1 Key metrics ........ 2",
                    "EU OV1 Overview of RWEA ........ 3",
                    "EU LIQ1 Quantitative information of LCR ........ 3",
                ],
            ),
            prepared(1, &["EU KM1 Key metrics", "1 Common Equity Tier 1 4,921", "2"]),
            prepared(2, &["EU OV1", "29 Total 38,000", "3"]),
        ];
        let report = locator.locate(&mut pages);
        assert!(pages[0].is_toc);
        assert!(report.is_toc(0));
        assert_eq!(report.index.get("KM1"), Some(2));
        assert_eq!(report.index.get("OV1"), Some(3));
        assert_eq!(report.indexed_candidates("KM1", 0), Some(vec![1]));
        assert_eq!(report.indexed_candidates("LR2", 1), None);
    }

    #[test]
    fn test_first_sighting_wins() {
        let mut index = LayoutIndex::new();
        assert!(index.insert("KM1", 4));
        assert!(!index.insert("KM1", 9));
        assert_eq!(index.get("KM1"), Some(4));
    }
}
