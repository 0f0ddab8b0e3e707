//! Document extraction pipeline.
//!
//! ```text
//! DocumentSource
//!     ↓
//! [prepare]  (tokens → lines, OCR for pages without a text layer)
//!     ↓
//! PreparedPage[]
//!     ↓
//! [LayoutLocator]  (template index, TOC pages, page number map)
//!     ↓
//! [MetadataDetector]  (entity, period, scale from front matter)
//!     ↓
//! per template: candidate pages → TableExtractor + TextExtractor → arbiter
//!     ↓
//! RawRowMatch[]  → dedup → normalize
//!     ↓
//! ExtractedFact[]
//! ```
//!
//! A document either yields a complete [`DocumentExtraction`] or an error;
//! partial results never leave the pipeline.

pub mod facts;
pub mod summary;

pub use facts::{normalize_row, ExtractedFact, FactKey};
pub use summary::{ExtractionSummary, LocatedBy, TemplateSummary};

use crate::arbiter;
use crate::catalog::TemplateCatalog;
use crate::config::ExtractionConfig;
use crate::document::{DocumentSource, OcrEngine};
use crate::error::{Error, Result};
use crate::extractors::{CompiledTemplate, RawRowMatch, RowExtractor, TableExtractor, TextExtractor};
use crate::layout::{LayoutLocator, LayoutReport, PreparedPage};
use crate::metadata::{MetadataDetector, ReportMetadata};
use serde::Serialize;
use std::sync::Arc;

/// Everything extracted from one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentExtraction {
    /// Identifier of the source file
    pub file_id: String,
    /// Detected report metadata
    pub metadata: ReportMetadata,
    /// Normalized facts, in catalog order
    pub facts: Vec<ExtractedFact>,
    /// Per-template outcome
    pub summary: ExtractionSummary,
}

/// The extraction pipeline.
///
/// Built once per catalog and configuration, then reused for every document.
pub struct ExtractionPipeline {
    catalog: Arc<TemplateCatalog>,
    config: ExtractionConfig,
    templates: Vec<CompiledTemplate>,
    locator: LayoutLocator,
    metadata: MetadataDetector,
    table: TableExtractor,
    text: TextExtractor,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl ExtractionPipeline {
    /// Create a pipeline over `catalog`.
    ///
    /// Fails when the configuration is invalid or a row matcher cannot be
    /// compiled.
    pub fn new(catalog: Arc<TemplateCatalog>, config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let templates = catalog
            .templates()
            .map(|t| CompiledTemplate::compile(t, &config))
            .collect::<Result<Vec<_>>>()?;
        let locator = LayoutLocator::new(&catalog, &config)?;

        Ok(Self {
            table: TableExtractor::new(&config),
            text: TextExtractor::new(&config),
            metadata: MetadataDetector::new(),
            ocr: None,
            catalog,
            config,
            templates,
            locator,
        })
    }

    /// Pipeline over the builtin catalog with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(TemplateCatalog::builtin(), ExtractionConfig::default())
    }

    /// Recover pages without a text layer through `engine`.
    pub fn with_ocr(mut self, engine: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Replace the metadata detector (e.g. with a custom entity table).
    pub fn with_metadata_detector(mut self, detector: MetadataDetector) -> Self {
        self.metadata = detector;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Get the template catalog.
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Extract all catalog templates from a document.
    pub fn extract(&self, source: &dyn DocumentSource, file_id: &str) -> Result<DocumentExtraction> {
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(Error::EmptyDocument);
        }

        let (mut pages, ocr_pages) = self.prepare_pages(source)?;
        let report = self.locator.locate(&mut pages);

        let front = self.config.front_matter_pages.min(pages.len());
        let front_text = pages[..front]
            .iter()
            .map(PreparedPage::text)
            .collect::<Vec<_>>()
            .join("\n");
        let metadata = self.metadata.detect(&front_text, file_id, &self.config);
        if metadata.is_low_confidence() {
            log::warn!("{}: metadata fell back to defaults ({} / {})", file_id, metadata.entity_id(), metadata.reporting_period());
        }

        let mut summary = ExtractionSummary {
            page_count,
            ocr_pages,
            toc_pages: report.toc_pages.len(),
            indexed_templates: report.index.len(),
            templates: Vec::new(),
        };
        let mut rows: Vec<RawRowMatch> = Vec::new();

        for template in &self.templates {
            let Some((located_by, candidates)) = self.candidate_pages(template.code(), &report, &pages) else {
                continue;
            };
            let candidate_refs: Vec<&PreparedPage> = candidates.iter().map(|&p| &pages[p]).collect();

            let table_rows = self.table.extract(template, &candidate_refs);
            let text_rows = self.text.extract(template, &candidate_refs);
            let (table_count, text_count) = (table_rows.len(), text_rows.len());
            let decision = arbiter::choose(template.definition(), table_rows, text_rows);

            summary.templates.push(TemplateSummary {
                template_code: template.code().to_string(),
                located_by,
                candidate_pages: candidates,
                table_rows: table_count,
                text_rows: text_count,
                strategy: decision.strategy,
                facts: 0,
            });
            rows.extend(decision.rows);
        }

        let facts = self.normalize(arbiter::dedup_rows(rows), &metadata);
        for entry in summary.templates.iter_mut() {
            entry.facts = facts.iter().filter(|f| f.template_code == entry.template_code).count();
            if entry.is_gap() {
                log::warn!(
                    "{}: {} is listed in the index but no rows were found on pages {:?}",
                    file_id,
                    entry.template_code,
                    entry.candidate_pages
                );
            }
        }

        log::info!(
            "{}: {} facts from {} templates ({} pages, {} via OCR)",
            file_id,
            facts.len(),
            summary.templates.iter().filter(|t| t.facts > 0).count(),
            page_count,
            ocr_pages
        );

        Ok(DocumentExtraction {
            file_id: file_id.to_string(),
            metadata,
            facts,
            summary,
        })
    }

    /// Read every page, recovering empty ones through OCR when an engine is set.
    fn prepare_pages(&self, source: &dyn DocumentSource) -> Result<(Vec<PreparedPage>, usize)> {
        let mut pages = Vec::with_capacity(source.page_count());
        let mut ocr_pages = 0;

        for index in 0..source.page_count() {
            let mut tokens = source.page_tokens(index)?;
            let tables = source.page_tables(index)?;

            if tokens.is_empty() && tables.is_empty() {
                if let Some(engine) = self.ocr.as_deref() {
                    if let Some(image) = source.page_image(index) {
                        match engine.recognize(&image) {
                            Ok(recognized) => {
                                log::debug!("Page {}: {} tokens recovered by OCR", index, recognized.len());
                                if !recognized.is_empty() {
                                    ocr_pages += 1;
                                }
                                tokens = recognized;
                            },
                            Err(e) => {
                                log::warn!("Page {}: OCR failed, continuing without text: {}", index, e);
                            },
                        }
                    }
                }
            }

            let height = source.page_size(index).map(|(_, h)| h);
            pages.push(PreparedPage::new(index, &tokens, tables, height));
        }

        Ok((pages, ocr_pages))
    }

    /// Candidate pages for a template: the indexed window when the template is
    /// listed, otherwise pages that mention it plus the discovery window.
    fn candidate_pages(
        &self,
        code: &str,
        report: &LayoutReport,
        pages: &[PreparedPage],
    ) -> Option<(LocatedBy, Vec<usize>)> {
        if let Some(candidates) = report.indexed_candidates(code, self.config.page_offset_window) {
            return Some((LocatedBy::Index, candidates));
        }

        let mut candidates: Vec<usize> = Vec::new();
        for page in pages.iter().filter(|p| !p.is_toc) {
            let mentioned = page
                .lines
                .iter()
                .any(|line| self.locator.find_template_mentions(&line.text).iter().any(|c| c == code));
            if !mentioned {
                continue;
            }
            let last = (page.index + self.config.discovery_window).min(pages.len() - 1);
            for p in page.index..=last {
                if !pages[p].is_toc && !candidates.contains(&p) {
                    candidates.push(p);
                }
            }
        }

        if candidates.is_empty() {
            None
        } else {
            log::debug!("{} discovered on pages {:?}", code, candidates);
            Some((LocatedBy::Discovery, candidates))
        }
    }

    fn normalize(&self, rows: Vec<RawRowMatch>, metadata: &ReportMetadata) -> Vec<ExtractedFact> {
        rows.iter()
            .filter_map(|row| {
                let template = self.catalog.get(&row.template_code)?;
                let fact = normalize_row(row, template, metadata, self.config.base_scale);
                if fact.is_none() {
                    log::debug!(
                        "{} row {}: dropped unparseable value {:?}",
                        row.template_code,
                        row.row_id,
                        row.numeric_string
                    );
                }
                fact
            })
            .collect()
    }
}
