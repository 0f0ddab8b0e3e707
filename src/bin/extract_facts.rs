//! Extract Disclosure Facts
//!
//! Runs the extraction pipeline over JSON documents and prints one fact per
//! line as JSON.
//!
//! Usage:
//!   cargo run --release --bin extract_facts -- report.json [more.json ...]
//!   cargo run --release --bin extract_facts -- --catalog templates.json --config config.json report.json
//!   cargo run --release --bin extract_facts -- --file-id dbk_2023 report.json
//!
//! Set RUST_LOG=debug for per-template diagnostics.

use disclosure_oxide::batch::BatchRunner;
use disclosure_oxide::catalog::TemplateCatalog;
use disclosure_oxide::config::ExtractionConfig;
use disclosure_oxide::document::Document;
use disclosure_oxide::pipeline::ExtractionPipeline;
use disclosure_oxide::store::MemoryFactStore;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

struct ExtractConfig {
    documents: Vec<PathBuf>,
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
    file_id: Option<String>,
    summary: bool,
}

impl ExtractConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut documents = Vec::new();
        let mut catalog = None;
        let mut config = None;
        let mut file_id = None;
        let mut summary = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--catalog" => {
                    i += 1;
                    if i < args.len() {
                        catalog = Some(PathBuf::from(&args[i]));
                    }
                },
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--file-id" => {
                    i += 1;
                    if i < args.len() {
                        file_id = Some(args[i].clone());
                    }
                },
                "--summary" | "-s" => {
                    summary = true;
                },
                other => documents.push(PathBuf::from(other)),
            }
            i += 1;
        }

        Self {
            documents,
            catalog,
            config,
            file_id,
            summary,
        }
    }
}

fn file_id_for(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn build_pipeline(args: &ExtractConfig) -> Result<ExtractionPipeline, Box<dyn std::error::Error>> {
    let catalog = match &args.catalog {
        Some(path) => Arc::new(TemplateCatalog::from_json_file(path)?),
        None => TemplateCatalog::builtin(),
    };
    let config = match &args.config {
        Some(path) => ExtractionConfig::from_json_file(path)?,
        None => ExtractionConfig::default(),
    };
    Ok(ExtractionPipeline::new(catalog, config)?)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = ExtractConfig::from_args();

    if args.documents.is_empty() {
        eprintln!("Usage: extract_facts [--catalog FILE] [--config FILE] [--file-id ID] [--summary] DOCUMENT.json...");
        return ExitCode::FAILURE;
    }
    if args.file_id.is_some() && args.documents.len() > 1 {
        eprintln!("Error: --file-id applies to a single document");
        return ExitCode::FAILURE;
    }

    let pipeline = match build_pipeline(&args) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let mut runner = BatchRunner::new(&pipeline, MemoryFactStore::new());
    let mut unreadable = 0;
    for path in &args.documents {
        let file_id = args.file_id.clone().unwrap_or_else(|| file_id_for(path));
        let doc = match Document::from_json_file(path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("✗ {}: {}", path.display(), e);
                unreadable += 1;
                continue;
            },
        };

        match runner.run_one(&doc, &file_id) {
            Ok(extraction) => {
                if args.summary {
                    match serde_json::to_string(&extraction.summary) {
                        Ok(line) => eprintln!("{}", line),
                        Err(e) => eprintln!("✗ {}: {}", file_id, e),
                    }
                }
            },
            Err(e) => eprintln!("✗ {}: {}", file_id, e),
        }
    }

    let (store, report) = runner.finish();
    for fact in store.facts() {
        match serde_json::to_string(fact) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("✗ {}", e),
        }
    }

    eprintln!(
        "{} documents, {} facts, {} failed",
        report.total() + unreadable,
        store.len(),
        report.failed.len() + unreadable
    );
    if report.is_clean() && unreadable == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
