//! End-to-end tests for the extraction pipeline.
//!
//! Tests document extraction, normalization, arbitration, idempotent
//! persistence and file-based configuration.

use chrono::NaiveDate;
use disclosure_oxide::catalog::TemplateCatalog;
use disclosure_oxide::config::ExtractionConfig;
use disclosure_oxide::document::{Document, DocumentSource, Page, Table, TextToken};
use disclosure_oxide::error::{Error, Result};
use disclosure_oxide::extractors::ExtractionStrategy;
use disclosure_oxide::metadata::{Confidence, FallbackReason, UNKNOWN_ENTITY};
use disclosure_oxide::numeric::AmountScale;
use disclosure_oxide::pipeline::{DocumentExtraction, ExtractionPipeline, LocatedBy};
use disclosure_oxide::store::{FactStore, MemoryFactStore};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn extract(doc: &Document, file_id: &str) -> DocumentExtraction {
    ExtractionPipeline::with_defaults()
        .unwrap()
        .extract(doc, file_id)
        .unwrap()
}

fn value_of(extraction: &DocumentExtraction, code: &str, row_id: &str) -> Option<f64> {
    extraction
        .facts
        .iter()
        .find(|f| f.template_code == code && f.row_id == row_id)
        .map(|f| f.value)
}

/// Index page, KM1 table page, trailing page.
fn km1_report() -> Document {
    Document::new(vec![
        Page::from_lines(["Pillar 3 Disclosures", "All amounts in millions", "EU KM1 ... 2"]),
        Page::new().with_table(Table::from_strings(vec![vec!["1", "Common Equity Tier 1", "4,921"]])),
        Page::from_lines(["Glossary"]),
    ])
}

/// Index page plus one KM1 page of text lines.
fn km1_text_report(scale_line: &str, body: &[&str]) -> Document {
    Document::new(vec![
        Page::from_lines(["Deutsche Bank", "Pillar 3 Report as at 31 December 2023", scale_line, "EU KM1 ... 2"]),
        Page::from_lines(body.iter().copied()),
    ])
}

// =============================================================================
// END TO END
// =============================================================================

mod end_to_end_tests {
    use super::*;

    #[test]
    fn test_three_page_km1_report() {
        let extraction = extract(&km1_report(), "report.json");

        assert_eq!(extraction.facts.len(), 1);
        let fact = &extraction.facts[0];
        assert_eq!(fact.template_code, "KM1");
        assert_eq!(fact.row_id, "1");
        assert_eq!(fact.value, 4921.0);
        assert!(!fact.is_ratio);
        assert_eq!(fact.source_page, 1);
        assert_eq!(fact.item_ref.as_deref(), Some("cet1_capital"));

        let km1 = extraction.summary.template("KM1").unwrap();
        assert_eq!(km1.located_by, LocatedBy::Index);
        assert_eq!(km1.strategy, ExtractionStrategy::Table);
        assert_eq!(km1.facts, 1);
    }

    #[test]
    fn test_metadata_detected_from_front_matter() {
        let doc = km1_text_report("All figures in EUR millions", &["1 Common Equity Tier 1 (CET1) capital 4,921"]);
        let extraction = extract(&doc, "report.json");
        assert_eq!(extraction.metadata.entity_id(), "DBK");
        assert_eq!(extraction.metadata.reporting_period(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(!extraction.metadata.is_low_confidence());
        assert!(extraction.facts.iter().all(|f| f.entity_id == "DBK"));
    }

    #[test]
    fn test_metadata_falls_back_to_file_name() {
        let extraction = extract(&km1_report(), "dbk_q2_2022.json");
        assert_eq!(extraction.metadata.entity_id(), "DBK");
        assert_eq!(
            extraction.metadata.entity.confidence,
            Confidence::Fallback(FallbackReason::FromFileName)
        );
        assert_eq!(extraction.metadata.reporting_period(), NaiveDate::from_ymd_opt(2022, 6, 30).unwrap());
        assert!(extraction.metadata.is_low_confidence());
    }

    #[test]
    fn test_unknown_entity_and_default_period() {
        let extraction = extract(&km1_report(), "report.json");
        assert_eq!(extraction.metadata.entity_id(), UNKNOWN_ENTITY);
        assert_eq!(extraction.metadata.reporting_period(), ExtractionConfig::default().default_period);
        assert_eq!(extraction.facts[0].entity_id, UNKNOWN_ENTITY);
    }

    #[test]
    fn test_front_matter_page_with_small_values() {
        let doc = Document::new(vec![
            Page::from_lines(["Deutsche Bank", "All amounts in EUR billions"]),
            Page::from_lines([
                "EU KM1 Key metrics",
                "3 Total capital 61",
                "4 Total risk exposure amount 310",
                "18 Total available stable funding 420",
                "19 Total required stable funding 380",
            ]),
        ]);
        let extraction = extract(&doc, "report.json");

        assert_eq!(extraction.summary.toc_pages, 0);
        let km1 = extraction.summary.template("KM1").unwrap();
        assert_eq!(km1.located_by, LocatedBy::Discovery);
        assert_eq!(km1.facts, 4);
        assert_eq!(value_of(&extraction, "KM1", "3"), Some(61_000.0));
        assert_eq!(value_of(&extraction, "KM1", "19"), Some(380_000.0));
    }

    #[test]
    fn test_table_label_without_identifier_keeps_amount_row() {
        let body = Page::new().with_table(Table::from_strings(vec![
            vec!["Total capital", "6,100"],
            vec!["Total capital ratio (%)", "18.9%"],
        ]));
        let doc = Document::new(vec![Page::from_lines(["in millions", "EU KM1 ... 2"]), body]);
        let extraction = extract(&doc, "report.json");

        let total = extraction.facts.iter().find(|f| f.row_id == "3").unwrap();
        assert_eq!(total.value, 6100.0);
        assert!(!total.is_ratio);
        let ratio = extraction.facts.iter().find(|f| f.row_id == "7").unwrap();
        assert!(ratio.is_ratio);
        assert!((ratio.value - 0.189).abs() < 1e-12);
    }

    #[test]
    fn test_indexed_template_missing_is_gap() {
        let doc = Document::new(vec![
            Page::from_lines(["in millions", "EU KM1 ... 2", "EU OV1 ... 3"]),
            Page::from_lines(["1 Common Equity Tier 1 (CET1) capital 4,921"]),
            Page::from_lines(["Nothing to see here"]),
        ]);
        let extraction = extract(&doc, "report.json");
        let gaps: Vec<&str> = extraction.summary.gaps().map(|t| t.template_code.as_str()).collect();
        assert_eq!(gaps, vec!["OV1"]);
        assert_eq!(value_of(&extraction, "KM1", "1"), Some(4921.0));
    }
}

// =============================================================================
// NORMALIZATION
// =============================================================================

mod normalization_tests {
    use super::*;

    #[test]
    fn test_ratio_rebasing() {
        let doc = km1_text_report(
            "in millions",
            &["5 Common Equity Tier 1 ratio (%) 18.93", "6 Tier 1 ratio (%) 0.1893"],
        );
        let extraction = extract(&doc, "report.json");
        let cet1 = value_of(&extraction, "KM1", "5").unwrap();
        let tier1 = value_of(&extraction, "KM1", "6").unwrap();
        assert!((cet1 - 0.1893).abs() < 1e-12);
        assert!((tier1 - 0.1893).abs() < 1e-12);
        assert!(extraction.facts.iter().all(|f| f.is_ratio));
    }

    #[test]
    fn test_thousands_scaled_to_millions() {
        let doc = km1_text_report(
            "All figures in EUR thousands",
            &["1 Common Equity Tier 1 (CET1) capital 1,500", "5 Common Equity Tier 1 ratio (%) 15.2%"],
        );
        let extraction = extract(&doc, "report.json");
        assert_eq!(extraction.metadata.amount_scale(), AmountScale::Thousands);
        assert!((value_of(&extraction, "KM1", "1").unwrap() - 1.5).abs() < 1e-12);
        assert!((value_of(&extraction, "KM1", "5").unwrap() - 0.152).abs() < 1e-12);
    }

    #[test]
    fn test_negative_and_parenthesized_amounts() {
        let doc = km1_text_report("in millions", &["3 Total capital (6,100)", "4 Total risk exposure amount \u{2014}45"]);
        let extraction = extract(&doc, "report.json");
        assert_eq!(value_of(&extraction, "KM1", "3"), Some(-6100.0));
        assert_eq!(value_of(&extraction, "KM1", "4"), Some(-45.0));
    }
}

// =============================================================================
// ARBITRATION
// =============================================================================

mod arbiter_tests {
    use super::*;

    #[test]
    fn test_text_replaces_table_wholesale() {
        let body = Page::from_lines([
            "1 Common Equity Tier 1 (CET1) capital 4,900",
            "2 Tier 1 capital 5,400",
            "3 Total capital 6,100",
        ])
        .with_table(Table::from_strings(vec![vec!["1", "Common Equity Tier 1", "4,921"]]));
        let doc = Document::new(vec![Page::from_lines(["in millions", "EU KM1 ... 2"]), body]);

        let extraction = extract(&doc, "report.json");
        let km1 = extraction.summary.template("KM1").unwrap();
        assert_eq!(km1.strategy, ExtractionStrategy::Text);
        assert_eq!((km1.table_rows, km1.text_rows), (1, 3));

        let rows: Vec<&str> = extraction.facts.iter().map(|f| f.row_id.as_str()).collect();
        assert_eq!(rows, vec!["1", "2", "3"]);
        // No row of the losing pass survives
        assert_eq!(value_of(&extraction, "KM1", "1"), Some(4900.0));
    }

    #[test]
    fn test_tie_keeps_table() {
        let body = Page::from_lines(["1 Common Equity Tier 1 (CET1) capital 4,900"])
            .with_table(Table::from_strings(vec![vec!["1", "Common Equity Tier 1", "4,921"]]));
        let doc = Document::new(vec![Page::from_lines(["in millions", "EU KM1 ... 2"]), body]);

        let extraction = extract(&doc, "report.json");
        assert_eq!(extraction.summary.template("KM1").unwrap().strategy, ExtractionStrategy::Table);
        assert_eq!(value_of(&extraction, "KM1", "1"), Some(4921.0));
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

mod persistence_tests {
    use super::*;

    #[test]
    fn test_rerun_is_idempotent() {
        let pipeline = ExtractionPipeline::with_defaults().unwrap();
        let doc = km1_text_report(
            "in millions",
            &["1 Common Equity Tier 1 (CET1) capital 4,921", "2 Tier 1 capital 5,400"],
        );
        let mut store = MemoryFactStore::new();

        let first = pipeline.extract(&doc, "dbk_2023.json").unwrap();
        store.upsert_all(&first.facts).unwrap();
        let snapshot: Vec<_> = store.facts().cloned().collect();

        let second = pipeline.extract(&doc, "dbk_2023.json").unwrap();
        store.upsert_all(&second.facts).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.facts().cloned().collect::<Vec<_>>(), snapshot);
    }
}

// =============================================================================
// ERRORS
// =============================================================================

mod error_tests {
    use super::*;

    struct BrokenSource;

    impl DocumentSource for BrokenSource {
        fn page_count(&self) -> usize {
            2
        }

        fn page_tokens(&self, page: usize) -> Result<Vec<TextToken>> {
            if page == 1 {
                return Err(Error::Unreadable {
                    page,
                    reason: "truncated content stream".to_string(),
                });
            }
            Ok(Page::from_lines(["in millions"]).tokens)
        }

        fn page_tables(&self, _page: usize) -> Result<Vec<Table>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_empty_document() {
        let pipeline = ExtractionPipeline::with_defaults().unwrap();
        assert!(matches!(pipeline.extract(&Document::default(), "x.json"), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_unreadable_page_aborts_document() {
        let pipeline = ExtractionPipeline::with_defaults().unwrap();
        let result = pipeline.extract(&BrokenSource, "broken.json");
        assert!(matches!(result, Err(Error::Unreadable { page: 1, .. })));
    }
}

// =============================================================================
// FILE-BASED CONFIGURATION
// =============================================================================

mod config_file_tests {
    use super::*;

    const CATALOG: &str = r#"{
        "templates": [
            {
                "code": "CC1",
                "title": "Composition of regulatory own funds",
                "aliases": ["composition of regulatory own funds"],
                "rows": [
                    { "row_id": "1", "label": "Capital instruments and the related share premium accounts", "item_ref": "cet1_instruments" },
                    { "row_id": "29", "label": "Common Equity Tier 1 (CET1) capital", "item_ref": "cet1_capital" }
                ]
            }
        ]
    }"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_catalog_and_config_from_files() {
        let catalog_file = write_temp(CATALOG);
        let config_file = write_temp(r#"{ "base_scale": "thousands", "front_matter_pages": 2 }"#);

        let catalog = TemplateCatalog::from_json_file(catalog_file.path()).unwrap();
        let config = ExtractionConfig::from_json_file(config_file.path()).unwrap();
        assert_eq!(config.base_scale, AmountScale::Thousands);
        assert_eq!(config.lookahead_lines, ExtractionConfig::default().lookahead_lines);

        let pipeline = ExtractionPipeline::new(Arc::new(catalog), config).unwrap();
        let doc = Document::new(vec![
            Page::from_lines(["in millions", "EU CC1 Composition of regulatory own funds ........ 2"]),
            Page::new().with_table(Table::from_strings(vec![vec!["29", "Common Equity Tier 1 (CET1) capital", "4,921"]])),
        ]);
        let extraction = pipeline.extract(&doc, "report.json").unwrap();
        assert_eq!(extraction.facts.len(), 1);
        assert_eq!(extraction.facts[0].template_code, "CC1");
        assert_eq!(extraction.facts[0].value, 4_921_000.0);
    }

    #[test]
    fn test_invalid_config_file_rejected() {
        let config_file = write_temp(r#"{ "front_matter_pages": 0 }"#);
        assert!(matches!(ExtractionConfig::from_json_file(config_file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_catalog_rejected() {
        let catalog_file = write_temp(r#"{ "templates": [ { "code": "X1", "rows": [], "rebase_exempt": ["9"] } ] }"#);
        assert!(matches!(TemplateCatalog::from_json_file(catalog_file.path()), Err(Error::Catalog(_))));
    }
}
