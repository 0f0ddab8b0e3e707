//! Extraction arbiter.
//!
//! Both extractors run on every `(document, template)` pair. Each result is
//! scored by the number of rows that map to a canonical item and carry a
//! parseable value; the text result replaces the table result wholesale only
//! when it scores strictly higher. Results are never merged: mixing rows from
//! two strategies risks double counting and conflicting scale assumptions.

use crate::catalog::{Dimension, TemplateDefinition};
use crate::extractors::{ExtractionStrategy, RawRowMatch};
use crate::numeric::{parse_number_in, NumberContext};
use std::collections::HashSet;

/// Outcome of arbitration for one template.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbiterDecision {
    /// Strategy whose rows were kept
    pub strategy: ExtractionStrategy,
    /// Score of the table pass
    pub table_score: usize,
    /// Score of the text pass
    pub text_score: usize,
    /// Rows of the winning pass
    pub rows: Vec<RawRowMatch>,
}

/// Count rows that resolve to a canonical item reference with a parseable value.
pub fn score(template: &TemplateDefinition, rows: &[RawRowMatch]) -> usize {
    rows.iter()
        .filter(|row| {
            template.row(&row.row_id).is_some_and(|spec| {
                spec.item_ref.is_some()
                    && parse_number_in(&row.numeric_string, NumberContext { ratio: spec.is_ratio }).is_some()
            })
        })
        .count()
}

/// Pick the richer of the two passes. Ties keep the table pass.
pub fn choose(template: &TemplateDefinition, table: Vec<RawRowMatch>, text: Vec<RawRowMatch>) -> ArbiterDecision {
    let table_score = score(template, &table);
    let text_score = score(template, &text);

    let (strategy, rows) = if table_score < text_score {
        (ExtractionStrategy::Text, text)
    } else {
        (ExtractionStrategy::Table, table)
    };

    log::debug!(
        "{}: table={} text={} -> {}",
        template.code,
        table_score,
        text_score,
        strategy
    );

    ArbiterDecision {
        strategy,
        table_score,
        text_score,
        rows,
    }
}

/// Drop repeated `(template_code, row_id, dimension)` keys; the first wins.
pub fn dedup_rows(rows: Vec<RawRowMatch>) -> Vec<RawRowMatch> {
    let mut seen: HashSet<(String, String, Option<Dimension>)> = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert((row.template_code.clone(), row.row_id.clone(), row.dimension)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;

    fn row(row_id: &str, value: &str, strategy: ExtractionStrategy) -> RawRowMatch {
        RawRowMatch {
            template_code: "KM1".to_string(),
            row_id: row_id.to_string(),
            label_matched: None,
            raw_text: format!("{} {}", row_id, value),
            numeric_string: value.to_string(),
            source_page: 1,
            dimension: None,
            strategy,
        }
    }

    #[test]
    fn test_text_replaces_table_wholesale() {
        let catalog = TemplateCatalog::builtin();
        let km1 = catalog.get("KM1").unwrap();
        let table = vec![row("1", "4,921", ExtractionStrategy::Table)];
        let text = vec![
            row("1", "4,900", ExtractionStrategy::Text),
            row("2", "5,400", ExtractionStrategy::Text),
        ];
        let decision = choose(km1, table, text.clone());
        assert_eq!(decision.strategy, ExtractionStrategy::Text);
        assert_eq!(decision.rows, text);
        assert_eq!((decision.table_score, decision.text_score), (1, 2));
    }

    #[test]
    fn test_tie_keeps_table() {
        let catalog = TemplateCatalog::builtin();
        let km1 = catalog.get("KM1").unwrap();
        let table = vec![row("1", "4,921", ExtractionStrategy::Table)];
        let text = vec![row("2", "5,400", ExtractionStrategy::Text)];
        assert_eq!(choose(km1, table, text).strategy, ExtractionStrategy::Table);
    }

    #[test]
    fn test_score_ignores_unmapped_and_unparseable() {
        let catalog = TemplateCatalog::builtin();
        let ov1 = catalog.get("OV1").unwrap();
        let rows = vec![
            row("24", "1,204", ExtractionStrategy::Text),
            row("1", "n/a", ExtractionStrategy::Text),
            row("2", "300", ExtractionStrategy::Text),
        ];
        assert_eq!(score(ov1, &rows), 1);
    }

    #[test]
    fn test_dedup_first_wins() {
        let rows = vec![
            row("1", "4,921", ExtractionStrategy::Table),
            row("1", "9,999", ExtractionStrategy::Table),
        ];
        let deduped = dedup_rows(rows);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].numeric_string, "4,921");
    }
}
