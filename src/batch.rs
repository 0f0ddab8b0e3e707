//! Batch extraction over many documents.
//!
//! Each document is extracted independently: a failure is recorded against
//! its file identifier and the batch moves on. Facts reach the store only
//! when a document's extraction completed.

use crate::document::DocumentSource;
use crate::error::{Error, Result};
use crate::pipeline::{DocumentExtraction, ExtractionPipeline};
use crate::store::FactStore;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Outcome of one document in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutcome {
    /// Identifier of the source file
    pub file_id: String,
    /// Facts committed for this document
    pub facts: usize,
    /// Indexed templates without facts
    pub gaps: Vec<String>,
    /// Metadata fell back to defaults
    pub low_confidence: bool,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Documents committed
    pub succeeded: Vec<DocumentOutcome>,
    /// Documents that failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Wall-clock time spent extracting
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchReport {
    /// Total documents attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Total facts committed.
    pub fn total_facts(&self) -> usize {
        self.succeeded.iter().map(|o| o.facts).sum()
    }

    /// True when every document succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs a pipeline over documents and commits facts to a store.
pub struct BatchRunner<'p, S: FactStore> {
    pipeline: &'p ExtractionPipeline,
    store: S,
    report: BatchReport,
}

impl<'p, S: FactStore> BatchRunner<'p, S> {
    /// Create a runner committing into `store`.
    pub fn new(pipeline: &'p ExtractionPipeline, store: S) -> Self {
        Self {
            pipeline,
            store,
            report: BatchReport::default(),
        }
    }

    /// Extract one document and commit its facts.
    ///
    /// Errors are recorded in the report and returned; the runner stays usable.
    pub fn run_one(&mut self, source: &dyn DocumentSource, file_id: &str) -> Result<DocumentExtraction> {
        let start = Instant::now();
        let result = self.extract_and_commit(source, file_id);
        self.report.elapsed += start.elapsed();

        match &result {
            Ok(extraction) => {
                self.report.succeeded.push(DocumentOutcome {
                    file_id: file_id.to_string(),
                    facts: extraction.facts.len(),
                    gaps: extraction
                        .summary
                        .gaps()
                        .map(|t| t.template_code.clone())
                        .collect(),
                    low_confidence: extraction.metadata.is_low_confidence(),
                });
            },
            Err(e) => {
                log::error!("{}: extraction failed: {}", file_id, e);
                self.report.failed.push((file_id.to_string(), e.to_string()));
            },
        }
        result
    }

    /// Extract every document, isolating failures.
    pub fn run_all<'d, I>(&mut self, documents: I) -> &BatchReport
    where
        I: IntoIterator<Item = (String, &'d dyn DocumentSource)>,
    {
        for (file_id, source) in documents {
            // Failures are already recorded in the report
            let _ = self.run_one(source, &file_id);
        }

        log::info!(
            "Batch complete: {}/{} documents, {} facts, {} failures in {:?}",
            self.report.succeeded.len(),
            self.report.total(),
            self.report.total_facts(),
            self.report.failed.len(),
            self.report.elapsed
        );
        &self.report
    }

    /// The report so far.
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// The fact store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the runner, returning the store and the report.
    pub fn finish(self) -> (S, BatchReport) {
        (self.store, self.report)
    }

    fn extract_and_commit(&mut self, source: &dyn DocumentSource, file_id: &str) -> Result<DocumentExtraction> {
        let extraction = self.pipeline.extract(source, file_id)?;
        let written = self
            .store
            .upsert_all(&extraction.facts)
            .map_err(|e| Error::Store(format!("{}: {}", file_id, e)))?;
        log::debug!("{}: committed {} facts", file_id, written);
        Ok(extraction)
    }
}
