//! Per-document extraction summary.

use crate::extractors::ExtractionStrategy;
use serde::Serialize;

/// How a template's candidate pages were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatedBy {
    /// Template index entry mapped to physical pages
    Index,
    /// Template code or alias mentioned in page text
    Discovery,
}

/// Outcome for one template of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    /// Template code
    pub template_code: String,
    /// How candidate pages were found
    pub located_by: LocatedBy,
    /// Physical candidate pages, in scan order
    pub candidate_pages: Vec<usize>,
    /// Rows found by the table pass
    pub table_rows: usize,
    /// Rows found by the text pass
    pub text_rows: usize,
    /// Strategy the arbiter kept
    pub strategy: ExtractionStrategy,
    /// Facts emitted after normalization
    pub facts: usize,
}

impl TemplateSummary {
    /// An indexed template that produced no facts.
    pub fn is_gap(&self) -> bool {
        self.located_by == LocatedBy::Index && self.facts == 0
    }
}

/// Outcome for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionSummary {
    /// Pages in the document
    pub page_count: usize,
    /// Pages recovered through OCR
    pub ocr_pages: usize,
    /// Pages classified as table of contents
    pub toc_pages: usize,
    /// Templates listed in the index
    pub indexed_templates: usize,
    /// Per-template outcomes, in catalog order
    pub templates: Vec<TemplateSummary>,
}

impl ExtractionSummary {
    /// Total facts across templates.
    pub fn total_facts(&self) -> usize {
        self.templates.iter().map(|t| t.facts).sum()
    }

    /// Templates listed in the index that yielded nothing.
    pub fn gaps(&self) -> impl Iterator<Item = &TemplateSummary> {
        self.templates.iter().filter(|t| t.is_gap())
    }

    /// Summary entry for a template code.
    pub fn template(&self, code: &str) -> Option<&TemplateSummary> {
        self.templates.iter().find(|t| t.template_code == code)
    }
}
