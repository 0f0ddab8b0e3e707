//! Table-based row extraction.
//!
//! For every row of every table on the candidate pages, the leading cells are
//! scanned for a row identifier, the adjacent label cell is checked against
//! the expected label, and the first later cell holding a number becomes the
//! value. Label overrides correct rows whose printed identifier is known to
//! be shifted; rows without an identifier cell are recovered by label.

use super::{
    is_footnote_marker, CompiledTemplate, DimensionSplitter, ExtractionStrategy, FirstSighting,
    RawRowMatch, RowExtractor, RowMatcher,
};
use crate::catalog::{Dimension, MatchStrategy};
use crate::config::ExtractionConfig;
use crate::layout::PreparedPage;
use crate::numeric::{parse_number_in, NumberContext};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A cell holding only a row identifier: "1", "4a", "EU 7a", "EU-16b", "1 3"
    static ref RE_ROW_ID: Regex =
        Regex::new(r"(?i)^(?:EU[\s\-]?)?\d(?:\s?\d){0,2}\s?[a-z]{0,2}[.)]?$").unwrap();

    /// A cell starting with an identifier followed by the label: "1 Common Equity"
    static ref RE_LEADING_ID: Regex =
        Regex::new(r"(?i)^((?:EU[\s\-]?)?\d{1,3}[a-z]{0,2})[\s.)]+(\p{L}.*)$").unwrap();
}

/// Reads template rows from structured tables.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    id_scan_cells: usize,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// A table row resolved to a template row.
struct LocatedRow<'a> {
    matcher: &'a RowMatcher,
    label: Option<String>,
    value_from: usize,
}

impl TableExtractor {
    /// Create an extractor from configuration.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            id_scan_cells: config.id_scan_cells,
        }
    }

    /// Resolve a table row to a template row.
    fn locate_row<'a>(&self, template: &'a CompiledTemplate, cells: &[(usize, &str)]) -> Option<LocatedRow<'a>> {
        let mut id: Option<(usize, String)> = cells
            .iter()
            .take_while(|(i, _)| *i < self.id_scan_cells)
            .find(|(_, text)| RE_ROW_ID.is_match(text))
            .map(|(i, text)| (*i, text.to_string()));

        let mut label: Option<(usize, String)> = cells
            .iter()
            .filter(|(i, _)| id.as_ref().map_or(true, |(id_pos, _)| i > id_pos))
            .find(|(_, text)| text.chars().any(char::is_alphabetic) && parse_number_in(text, NumberContext::amount()).is_none())
            .map(|(i, text)| (*i, text.to_string()));

        // Identifier and label merged into one cell
        if id.is_none() {
            let merged = label.as_ref().and_then(|(pos, text)| {
                RE_LEADING_ID
                    .captures(text)
                    .map(|caps| (*pos, caps[1].to_string(), caps[2].to_string()))
            });
            if let Some((pos, printed, rest)) = merged {
                id = Some((pos, printed));
                label = Some((pos, rest));
            }
        }

        let definition = template.definition();
        let label_text = label.as_ref().map(|(_, text)| text.as_str());
        let mut confirmed = false;

        let overridden = label_text
            .and_then(|l| definition.override_for_label(l))
            .and_then(|spec| template.matcher(&spec.row_id));

        let matcher = if let Some(m) = overridden {
            confirmed = true;
            m
        } else {
            let by_id = id
                .as_ref()
                .and_then(|(_, printed)| definition.resolve_row_id(printed))
                .and_then(|spec| template.matcher(&spec.row_id))
                .filter(|m| m.row().matcher != MatchStrategy::LabelOnly);

            match (by_id, label_text) {
                (Some(m), None) => m,
                (Some(m), Some(l)) => match template.best_label_match(l) {
                    // The printed identifier stands unless another row's label fits better
                    Some((recovered, score))
                        if recovered.row_id() != m.row_id() && m.label_score(l).map_or(true, |own| score > own) =>
                    {
                        log::trace!(
                            "{}: identifier {} relabelled as row {} by label {:?}",
                            template.code(),
                            m.row_id(),
                            recovered.row_id(),
                            l
                        );
                        confirmed = true;
                        recovered
                    },
                    _ if m.matches_cell(l) => {
                        confirmed = true;
                        m
                    },
                    _ if m.row().matcher == MatchStrategy::ExactId => m,
                    _ => return None,
                },
                (None, Some(l)) => {
                    confirmed = true;
                    template.recover_by_label(l)?
                },
                (None, None) => return None,
            }
        };

        let value_from = id
            .iter()
            .map(|(i, _)| *i)
            .chain(label.iter().map(|(i, _)| *i))
            .max()
            .map_or(0, |i| i + 1);

        Some(LocatedRow {
            matcher,
            label: label.filter(|_| confirmed).map(|(_, text)| text),
            value_from,
        })
    }
}

/// A bare integer cell that names one of the template's rows.
fn is_plausible_row_id(template: &CompiledTemplate, text: &str) -> bool {
    text.len() <= 3
        && text.chars().all(|c| c.is_ascii_digit())
        && template.definition().resolve_row_id(text).is_some()
}

/// A number printed with a separator or percent sign.
fn is_formatted_number(text: &str) -> bool {
    text.contains(['.', ',', '%', '\'', '\u{a0}', '\u{202f}'])
}

impl RowExtractor for TableExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Table
    }

    fn extract(&self, template: &CompiledTemplate, pages: &[&PreparedPage]) -> Vec<RawRowMatch> {
        let definition = template.definition();
        let mut splitter = definition
            .is_multi_dimensional()
            .then(|| DimensionSplitter::new(&definition.dimensions));
        let mut seen = FirstSighting::default();
        let mut matches = Vec::new();

        for page in pages.iter().filter(|p| !p.is_toc) {
            for table in &page.tables {
                for row in &table.rows {
                    let cells: Vec<(usize, &str)> = row
                        .iter()
                        .enumerate()
                        .filter_map(|(i, cell)| {
                            let text = cell.as_deref()?.trim();
                            (!text.is_empty()).then_some((i, text))
                        })
                        .collect();
                    if cells.is_empty() {
                        continue;
                    }

                    let Some(located) = self.locate_row(template, &cells) else {
                        continue;
                    };
                    let spec = located.matcher.row();
                    let ctx = NumberContext { ratio: spec.is_ratio };
                    let numeric: Vec<&str> = cells
                        .iter()
                        .filter(|(i, _)| *i >= located.value_from)
                        .map(|(_, text)| *text)
                        .filter(|text| *text != located.matcher.id_core())
                        .filter(|text| !is_footnote_marker(text))
                        .filter(|text| parse_number_in(text, ctx).is_some())
                        .collect();
                    let values: Vec<&str> = numeric
                        .iter()
                        .enumerate()
                        .filter(|(k, text)| {
                            !(is_plausible_row_id(template, text)
                                && numeric[k + 1..].iter().any(|later| is_formatted_number(later)))
                        })
                        .map(|(_, text)| *text)
                        .collect();

                    let picked: Vec<(Option<Dimension>, &str)> = match splitter.as_mut() {
                        Some(splitter) => splitter
                            .split(&values, spec.only_dimension)
                            .into_iter()
                            .map(|(dim, v)| (Some(dim), v))
                            .collect(),
                        None => values.first().map(|v| (None, *v)).into_iter().collect(),
                    };

                    let raw_text = cells.iter().map(|(_, t)| *t).collect::<Vec<_>>().join(" | ");
                    for (dimension, value) in picked {
                        let candidate = RawRowMatch {
                            template_code: template.code().to_string(),
                            row_id: spec.row_id.clone(),
                            label_matched: located.label.clone(),
                            raw_text: raw_text.clone(),
                            numeric_string: value.to_string(),
                            source_page: page.index,
                            dimension,
                            strategy: ExtractionStrategy::Table,
                        };
                        if seen.admit(&candidate) {
                            log::trace!(
                                "{} row {} = {:?} (table, page {})",
                                candidate.template_code,
                                candidate.row_id,
                                candidate.numeric_string,
                                candidate.source_page
                            );
                            matches.push(candidate);
                        }
                    }
                }
            }
        }

        matches
    }
}
