//! Text-based row extraction.
//!
//! Used for layouts that defeat table detection: condensed fonts, wrapped
//! labels and pages that expose no tables at all. Each reconstructed line is
//! run through the template's row matchers; the value is the first qualifying
//! numeric token after the match, or, for vertically stacked layouts, the
//! first one found within a few following lines.

use super::{
    is_footnote_marker, CompiledTemplate, DimensionSplitter, ExtractionStrategy, FirstSighting,
    LineMatch, RawRowMatch, RowExtractor, RowMatcher,
};
use crate::catalog::Dimension;
use crate::config::ExtractionConfig;
use crate::layout::{PreparedPage, TextLine};
use crate::numeric::{is_followed_by_word, scan_numeric_tokens, NumericToken};

/// Reads template rows from reconstructed text lines.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    lookahead_lines: usize,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// A matched row and the text it was matched in.
struct LineHit<'a> {
    matcher: &'a RowMatcher,
    hit: LineMatch,
    text: String,
    /// Lines consumed by the match (2 when the identifier sits on its own line)
    consumed: usize,
}

impl TextExtractor {
    /// Create an extractor from configuration.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            lookahead_lines: config.lookahead_lines,
        }
    }

    fn match_at<'a>(&self, template: &'a CompiledTemplate, lines: &[TextLine], i: usize) -> Option<LineHit<'a>> {
        let line = lines[i].text.as_str();
        if let Some((matcher, hit)) = template.best_line_match(line) {
            return Some(LineHit {
                matcher,
                hit,
                text: line.to_string(),
                consumed: 1,
            });
        }

        // Identifier alone on its line, label on the next one
        let next = lines.get(i + 1)?;
        let alone = template
            .matchers()
            .iter()
            .any(|m| m.starts_with_id(line).is_some_and(|end| line[end..].trim().is_empty()));
        if !alone {
            return None;
        }
        let joined = format!("{} {}", line.trim_end(), next.text);
        let (matcher, hit) = template.best_line_match(&joined)?;
        Some(LineHit {
            matcher,
            hit,
            text: joined,
            consumed: 2,
        })
    }
}

/// Numeric tokens of `text` that can be a row's value.
///
/// Tokens followed by a word belong to the label ("Tier 1 capital"); a bare
/// token equal to the row identifier is the identifier repeated; a small
/// parenthesized integer is a footnote marker.
fn qualifying_tokens(text: &str, matcher: &RowMatcher) -> Vec<NumericToken> {
    scan_numeric_tokens(text)
        .into_iter()
        .filter(|t| !is_followed_by_word(text, t.end))
        .filter(|t| !(t.is_bare_small_integer() && t.text == matcher.id_core()))
        .filter(|t| !is_footnote_marker(&t.text))
        .collect()
}

impl RowExtractor for TextExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Text
    }

    fn extract(&self, template: &CompiledTemplate, pages: &[&PreparedPage]) -> Vec<RawRowMatch> {
        let definition = template.definition();
        let mut splitter = definition
            .is_multi_dimensional()
            .then(|| DimensionSplitter::new(&definition.dimensions));
        let mut seen = FirstSighting::default();
        let mut matches = Vec::new();

        for page in pages.iter().filter(|p| !p.is_toc) {
            let lines = &page.lines;
            for i in 0..lines.len() {
                let Some(LineHit {
                    matcher,
                    hit,
                    text,
                    consumed,
                }) = self.match_at(template, lines, i)
                else {
                    continue;
                };

                let mut raw_text = text.clone();
                let mut values = qualifying_tokens(&text[hit.end..], matcher);
                if values.is_empty() {
                    for next in lines.iter().skip(i + consumed).take(self.lookahead_lines) {
                        if template.starts_any_row(&next.text) {
                            break;
                        }
                        let found = qualifying_tokens(&next.text, matcher);
                        if !found.is_empty() {
                            raw_text.push('\n');
                            raw_text.push_str(&next.text);
                            values = found;
                            break;
                        }
                    }
                }
                if values.is_empty() {
                    log::trace!("{} row {}: matched without value on page {}", template.code(), matcher.row_id(), page.index);
                    continue;
                }

                let spec = matcher.row();
                let texts: Vec<&str> = values.iter().map(|t| t.text.as_str()).collect();
                let picked: Vec<(Option<Dimension>, &str)> = match splitter.as_mut() {
                    Some(splitter) => splitter
                        .split(&texts, spec.only_dimension)
                        .into_iter()
                        .map(|(dim, v)| (Some(dim), v))
                        .collect(),
                    None => texts.first().map(|v| (None, *v)).into_iter().collect(),
                };

                for (dimension, value) in picked {
                    let candidate = RawRowMatch {
                        template_code: template.code().to_string(),
                        row_id: spec.row_id.clone(),
                        label_matched: hit.label_matched.then(|| spec.expected_label.clone()),
                        raw_text: raw_text.clone(),
                        numeric_string: value.to_string(),
                        source_page: page.index,
                        dimension,
                        strategy: ExtractionStrategy::Text,
                    };
                    if seen.admit(&candidate) {
                        log::trace!(
                            "{} row {} = {:?} (text, page {})",
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

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;
    use crate::document::Page;

    fn compiled(code: &str) -> CompiledTemplate {
        let catalog = TemplateCatalog::builtin();
        CompiledTemplate::compile(catalog.get(code).unwrap(), &ExtractionConfig::default()).unwrap()
    }

    fn page(lines: &[&str]) -> PreparedPage {
        let page = Page::from_lines(lines.iter().copied());
        PreparedPage::new(3, &page.tokens, Vec::new(), None)
    }

    fn run(code: &str, page: &PreparedPage) -> Vec<RawRowMatch> {
        TextExtractor::default().extract(&compiled(code), &[page])
    }

    fn values(rows: &[RawRowMatch]) -> Vec<(&str, &str)> {
        rows.iter()
            .map(|r| (r.row_id.as_str(), r.numeric_string.as_str()))
            .collect()
    }

    #[test]
    fn test_same_line_values() {
        let page = page(&[
            "EU KM1 - Key metrics template",
            "1 Common Equity Tier 1 (CET1) capital 4,921 4,800",
            "2 Tier 1 capital 5,400 5,300",
            "5 Common Equity Tier 1 ratio (%) 15.2% 14.9%",
            "EU 7a Additional own funds requirements (%) 2.5%",
        ]);
        let rows = run("KM1", &page);
        assert_eq!(
            values(&rows),
            vec![("1", "4,921"), ("2", "5,400"), ("5", "15.2%"), ("EU 7a", "2.5%")]
        );
        assert!(rows.iter().all(|r| r.source_page == 3 && r.strategy == ExtractionStrategy::Text));
    }

    #[test]
    fn test_vertical_stack_lookahead() {
        let page = page(&["3", "Total capital", "6,100", "4", "Total risk exposure amount", "31,000"]);
        assert_eq!(values(&run("KM1", &page)), vec![("3", "6,100"), ("4", "31,000")]);
    }

    #[test]
    fn test_lookahead_stops_at_next_row() {
        let page = page(&["1 Common Equity Tier 1 capital", "2 Tier 1 capital 5,400"]);
        assert_eq!(values(&run("KM1", &page)), vec![("2", "5,400")]);
    }

    #[test]
    fn test_footnotes_and_label_numbers_skipped() {
        let page = page(&["24 Amounts below the thresholds for deduction (subject to 250% risk weight) (1) 1,204"]);
        assert_eq!(values(&run("OV1", &page)), vec![("24", "1,204")]);
    }

    #[test]
    fn test_label_only_rows() {
        let page = page(&["Liquidity buffer 45,000", "Total net cash outflows 30,000", "Liquidity coverage ratio (%) 150%"]);
        assert_eq!(
            values(&run("LIQ1", &page)),
            vec![("21", "45,000"), ("22", "30,000"), ("23", "150%")]
        );
    }

    #[test]
    fn test_multi_dimension_calibration() {
        let page = page(&[
            "1 Parallel up -120 -95 -40 -31",
            "2 Parallel down 85 70 22 18",
            "3 Steepener 15 12",
        ]);
        let rows = run("IRRBB1", &page);
        let got: Vec<(&str, Option<Dimension>, &str)> = rows
            .iter()
            .map(|r| (r.row_id.as_str(), r.dimension, r.numeric_string.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("1", Some(Dimension::Primary), "-120"),
                ("1", Some(Dimension::Secondary), "-40"),
                ("2", Some(Dimension::Primary), "85"),
                ("2", Some(Dimension::Secondary), "22"),
                ("3", Some(Dimension::Primary), "15"),
            ]
        );
    }
}
