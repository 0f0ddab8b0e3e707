//! Error types for the extraction engine.
//!
//! Detection misses (entity, period, scale, template location) and unparseable
//! numbers are never errors: they degrade to fallbacks or dropped candidates.
//! The variants here cover the few conditions that abort a whole document or
//! a configuration load.

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading inputs or extracting a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document has no pages
    #[error("Document is empty: no pages to extract")]
    EmptyDocument,

    /// A page could not be read from the document source
    #[error("Failed to read page {page}: {reason}")]
    Unreadable {
        /// Physical page index (0-based)
        page: usize,
        /// Reason reported by the document source
        reason: String,
    },

    /// Template catalog is malformed
    #[error("Invalid template catalog: {0}")]
    Catalog(String),

    /// Extraction configuration is malformed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Spreadsheet could not be opened or read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// OCR engine failure (always recovered by the pipeline)
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Fact store rejected a write
    #[error("Fact store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generated pattern failed to compile
    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_error() {
        let err = Error::Unreadable {
            page: 4,
            reason: "truncated stream".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("page 4"));
        assert!(msg.contains("truncated stream"));
    }

    #[test]
    fn test_catalog_error() {
        let err = Error::Catalog("duplicate row 1 in KM1".to_string());
        assert!(format!("{}", err).contains("duplicate row 1 in KM1"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
