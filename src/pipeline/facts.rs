//! Normalized facts, the terminal artifact of extraction.

use crate::catalog::{Dimension, TemplateDefinition};
use crate::extractors::RawRowMatch;
use crate::metadata::ReportMetadata;
use crate::numeric::{apply_scale, parse_number_in, rebase_ratio, AmountScale, NumberContext};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Idempotence key of a fact: re-extraction replaces, never duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactKey {
    /// Reporting entity
    pub entity_id: String,
    /// End of the reporting period
    pub reporting_period: NaiveDate,
    /// Template code
    pub template_code: String,
    /// Row identifier
    pub row_id: String,
    /// Dimension, for multi-dimension templates
    pub dimension: Option<Dimension>,
}

/// A normalized numeric fact.
///
/// Amount values are expressed in the configured base scale; ratio values
/// are fractions (0.1893 for 18.93%) and never scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFact {
    /// Reporting entity
    pub entity_id: String,
    /// End of the reporting period
    pub reporting_period: NaiveDate,
    /// Template code
    pub template_code: String,
    /// Row identifier
    pub row_id: String,
    /// Dimension, for multi-dimension templates
    pub dimension: Option<Dimension>,
    /// Canonical cross-template item, when known
    pub item_ref: Option<String>,
    /// Normalized value
    pub value: f64,
    /// The row reports a ratio
    pub is_ratio: bool,
    /// Physical page the value was read from
    pub source_page: usize,
}

impl ExtractedFact {
    /// The fact's idempotence key.
    pub fn key(&self) -> FactKey {
        FactKey {
            entity_id: self.entity_id.clone(),
            reporting_period: self.reporting_period,
            template_code: self.template_code.clone(),
            row_id: self.row_id.clone(),
            dimension: self.dimension,
        }
    }
}

/// Normalize a raw row match into a fact.
///
/// Ratio rows are re-based from percentage points unless exempt; amount rows
/// are converted from the document scale into `base`. Returns `None` when the
/// row is unknown to the template or its value does not parse.
pub fn normalize_row(
    row: &RawRowMatch,
    template: &TemplateDefinition,
    metadata: &ReportMetadata,
    base: AmountScale,
) -> Option<ExtractedFact> {
    let spec = template.row(&row.row_id)?;
    let parsed = parse_number_in(&row.numeric_string, NumberContext { ratio: spec.is_ratio })?;
    let value = if spec.is_ratio {
        rebase_ratio(parsed, template.is_rebase_exempt(&spec.row_id))
    } else {
        apply_scale(parsed, metadata.amount_scale(), base)
    };

    Some(ExtractedFact {
        entity_id: metadata.entity_id().to_string(),
        reporting_period: metadata.reporting_period(),
        template_code: row.template_code.clone(),
        row_id: spec.row_id.clone(),
        dimension: row.dimension,
        item_ref: spec.item_ref.clone(),
        value,
        is_ratio: spec.is_ratio,
        source_page: row.source_page,
    })
}
