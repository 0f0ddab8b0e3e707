//! Configuration for disclosure extraction.
//!
//! Every field has a default, so a JSON configuration only needs to name the
//! values it overrides:
//!
//! ```
//! use disclosure_oxide::config::ExtractionConfig;
//!
//! let config = ExtractionConfig::from_json_str(r#"{ "page_offset_window": 3 }"#).unwrap();
//! assert_eq!(config.page_offset_window, 3);
//! assert_eq!(config.front_matter_pages, 12);
//! ```

use crate::error::{Error, Result};
use crate::numeric::AmountScale;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of leading pages scanned for the template index and metadata.
    pub front_matter_pages: usize,

    /// Tolerated drift (in pages) around an indexed logical page.
    pub page_offset_window: usize,

    /// Pages following a text-search hit that are also scanned.
    pub discovery_window: usize,

    /// Lines after a matched row searched for its value.
    pub lookahead_lines: usize,

    /// Characters of the expected label used to build the fuzzy matcher.
    pub label_prefix_len: usize,

    /// Leading table cells scanned for a row identifier.
    pub id_scan_cells: usize,

    /// Scale into which amount rows are converted.
    pub base_scale: AmountScale,

    /// Reporting period used when none can be detected.
    pub default_period: NaiveDate,

    /// Fraction of page height treated as header or footer.
    pub header_footer_band: f32,

    /// Minimum TOC-like lines before a page is classified as a TOC page.
    pub min_toc_entries: usize,

    /// Minimum share of TOC-like lines on a TOC page.
    pub toc_line_ratio: f32,

    /// Minimum consecutive filler dots forming a dot leader.
    pub min_dot_leader: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            front_matter_pages: 12,
            page_offset_window: 2,
            discovery_window: 1,
            lookahead_lines: 4,
            label_prefix_len: 24,
            id_scan_cells: 3,
            base_scale: AmountScale::Millions,
            default_period: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            header_footer_band: 0.08,
            min_toc_entries: 3,
            toc_line_ratio: 0.3,
            min_dot_leader: 3,
        }
    }

    /// Parse a JSON configuration; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject settings that would make extraction meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.front_matter_pages == 0 {
            return Err(Error::Config("front_matter_pages must be at least 1".to_string()));
        }
        if self.label_prefix_len < 4 {
            return Err(Error::Config("label_prefix_len must be at least 4".to_string()));
        }
        if self.id_scan_cells == 0 {
            return Err(Error::Config("id_scan_cells must be at least 1".to_string()));
        }
        if !(0.0..0.5).contains(&self.header_footer_band) {
            return Err(Error::Config(format!(
                "header_footer_band must be in [0, 0.5), got {}",
                self.header_footer_band
            )));
        }
        Ok(())
    }

    /// Set the number of front-matter pages.
    pub fn with_front_matter_pages(mut self, pages: usize) -> Self {
        self.front_matter_pages = pages;
        self
    }

    /// Set the page offset window.
    pub fn with_page_offset_window(mut self, window: usize) -> Self {
        self.page_offset_window = window;
        self
    }

    /// Set the lookahead for vertically stacked layouts.
    pub fn with_lookahead_lines(mut self, lines: usize) -> Self {
        self.lookahead_lines = lines;
        self
    }

    /// Set the base scale for amounts.
    pub fn with_base_scale(mut self, scale: AmountScale) -> Self {
        self.base_scale = scale;
        self
    }

    /// Set the fallback reporting period.
    pub fn with_default_period(mut self, period: NaiveDate) -> Self {
        self.default_period = period;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.front_matter_pages, 12);
        assert_eq!(config.base_scale, AmountScale::Millions);
        assert_eq!(config.default_period, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_partial_json() {
        let config = ExtractionConfig::from_json_str(
            r#"{ "base_scale": "thousands", "default_period": "2023-06-30" }"#,
        )
        .unwrap();
        assert_eq!(config.base_scale, AmountScale::Thousands);
        assert_eq!(config.default_period, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        assert_eq!(config.lookahead_lines, 4);
    }

    #[test]
    fn test_validation() {
        assert!(ExtractionConfig::from_json_str(r#"{ "front_matter_pages": 0 }"#).is_err());
        assert!(ExtractionConfig::from_json_str(r#"{ "header_footer_band": 0.7 }"#).is_err());
    }

    #[test]
    fn test_builder() {
        let config = ExtractionConfig::new()
            .with_page_offset_window(1)
            .with_base_scale(AmountScale::Units);
        assert_eq!(config.page_offset_window, 1);
        assert_eq!(config.base_scale, AmountScale::Units);
    }
}
