//! Report metadata detection: reporting entity, period and amount scale.
//!
//! Every detection is best-effort. A miss never fails the document; it
//! produces an explicit fallback value tagged with the reason, so consumers
//! can tell a detected period from a defaulted one.

pub mod entity;
pub mod period;
pub mod scale;

pub use entity::{Entity, EntityPattern, EntityTable, UNKNOWN_ENTITY};
pub use period::detect_period;
pub use scale::detect_scale;

use crate::config::ExtractionConfig;
use crate::numeric::AmountScale;
use chrono::NaiveDate;
use serde::Serialize;

/// Why a fallback value was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Value taken from the document's file identifier
    FromFileName,
    /// Hard-coded default
    Default,
}

/// How a metadata value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Found in the document text
    Detected,
    /// Not found in the text
    Fallback(FallbackReason),
}

/// A detected value together with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection<T> {
    /// The value
    pub value: T,
    /// How it was obtained
    pub confidence: Confidence,
}

impl<T> Detection<T> {
    /// A value found in the document text.
    pub fn detected(value: T) -> Self {
        Self {
            value,
            confidence: Confidence::Detected,
        }
    }

    /// A fallback value.
    pub fn fallback(value: T, reason: FallbackReason) -> Self {
        Self {
            value,
            confidence: Confidence::Fallback(reason),
        }
    }

    /// True when the value came from the document text.
    pub fn is_detected(&self) -> bool {
        self.confidence == Confidence::Detected
    }
}

/// Entity, period and scale of one report. Immutable once detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// Reporting entity
    pub entity: Detection<Entity>,
    /// End of the reporting period
    pub period: Detection<NaiveDate>,
    /// Unit in which amounts are reported
    pub scale: Detection<AmountScale>,
}

impl ReportMetadata {
    /// Canonical entity identifier.
    pub fn entity_id(&self) -> &str {
        &self.entity.value.id
    }

    /// Entity display name.
    pub fn entity_display_name(&self) -> &str {
        &self.entity.value.display_name
    }

    /// End-of-period date.
    pub fn reporting_period(&self) -> NaiveDate {
        self.period.value
    }

    /// Amount scale.
    pub fn amount_scale(&self) -> AmountScale {
        self.scale.value
    }

    /// True when entity or period had to fall back.
    ///
    /// A defaulted scale alone does not count: many reports print plain units.
    pub fn is_low_confidence(&self) -> bool {
        !self.entity.is_detected() || !self.period.is_detected()
    }
}

/// Detects [`ReportMetadata`] from front-matter text.
#[derive(Debug, Clone)]
pub struct MetadataDetector {
    entities: EntityTable,
}

impl Default for MetadataDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataDetector {
    /// Detector using the builtin entity table.
    pub fn new() -> Self {
        Self {
            entities: EntityTable::builtin(),
        }
    }

    /// Detector using a custom entity table.
    pub fn with_entities(entities: EntityTable) -> Self {
        Self { entities }
    }

    /// Detect metadata from front-matter text and the document's file identifier.
    pub fn detect(&self, front_text: &str, file_id: &str, config: &ExtractionConfig) -> ReportMetadata {
        let metadata = ReportMetadata {
            entity: self.entities.detect_with_fallback(front_text, file_id),
            period: detect_period(front_text, file_id, config.default_period),
            scale: detect_scale(front_text),
        };

        log::debug!(
            "Metadata for {}: entity={} ({:?}), period={} ({:?}), scale={} ({:?})",
            file_id,
            metadata.entity_id(),
            metadata.entity.confidence,
            metadata.period.value,
            metadata.period.confidence,
            metadata.scale.value,
            metadata.scale.confidence
        );

        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_all_fields() {
        let text = "Deutsche Bank\nPillar 3 Report as at 31 December 2023\nAll figures in EUR millions";
        let metadata = MetadataDetector::new().detect(text, "report.json", &ExtractionConfig::default());
        assert_eq!(metadata.entity_id(), "DBK");
        assert_eq!(metadata.reporting_period(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(metadata.amount_scale(), AmountScale::Millions);
        assert!(!metadata.is_low_confidence());
    }

    #[test]
    fn test_fallbacks_are_tagged() {
        let config = ExtractionConfig::default();
        let metadata = MetadataDetector::new().detect("Risk report", "no-dates-here", &config);
        assert_eq!(metadata.entity_id(), UNKNOWN_ENTITY);
        assert_eq!(metadata.entity.confidence, Confidence::Fallback(FallbackReason::Default));
        assert_eq!(metadata.reporting_period(), config.default_period);
        assert_eq!(metadata.scale.value, AmountScale::Units);
        assert!(metadata.is_low_confidence());
    }
}
