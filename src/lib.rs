// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::regex_creation_in_loops)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # Disclosure Oxide
//!
//! Extraction and normalization engine for regulatory disclosure reports
//! (Pillar 3 style templates such as KM1, OV1, LR2, LIQ1 and IRRBB1).
//!
//! ## Core Features
//!
//! - **Template location**: template index scanning, TOC page classification,
//!   printed-to-physical page mapping and text discovery for unindexed templates
//! - **Row extraction**: table and text strategies with fuzzy identifier and
//!   label matching, wrapped-label lookahead and multi-dimension splitting
//! - **Arbitration**: per template, the richer strategy wins wholesale
//! - **Normalization**: locale-aware number parsing, ratio re-basing and
//!   amount scaling into one base unit
//! - **Metadata**: entity, reporting period and amount scale detection with
//!   explicit fallback confidence
//! - **Idempotent persistence**: facts keyed by entity, period, template, row
//!   and dimension
//!
//! ## Quick Start
//!
//! ```ignore
//! use disclosure_oxide::document::Document;
//! use disclosure_oxide::pipeline::ExtractionPipeline;
//! use disclosure_oxide::store::{FactStore, MemoryFactStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::from_json_file("dbk_2023.json")?;
//! let pipeline = ExtractionPipeline::with_defaults()?;
//! let extraction = pipeline.extract(&doc, "dbk_2023.json")?;
//!
//! let mut store = MemoryFactStore::new();
//! store.upsert_all(&extraction.facts)?;
//! for fact in store.facts() {
//!     println!("{} {} = {}", fact.template_code, fact.row_id, fact.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under MIT OR Apache-2.0, at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration and reference data
pub mod catalog;
pub mod config;

// Document model
pub mod document;
pub mod geometry;

// Analysis
pub mod layout;
pub mod metadata;
pub mod numeric;

// Extraction
pub mod arbiter;
pub mod extractors;
pub mod pipeline;

// Persistence
pub mod batch;
pub mod store;

// Re-exports
pub use batch::{BatchReport, BatchRunner};
pub use catalog::{TemplateCatalog, TemplateDefinition};
pub use config::ExtractionConfig;
pub use document::{Document, DocumentSource, OcrEngine};
pub use error::{Error, Result};
pub use pipeline::{DocumentExtraction, ExtractedFact, ExtractionPipeline, FactKey};
pub use store::{FactStore, MemoryFactStore};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all other values.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
