//! Declarative per-row matchers.
//!
//! Each [`RowSpec`] compiles into a [`RowMatcher`] according to its
//! [`MatchStrategy`]. Identifier patterns accept an optional `EU` marker and
//! stray spaces between the characters of the identifier; label patterns are
//! built from a truncated, punctuation-normalized prefix of the expected label
//! in which `1` and `I` are interchangeable.

use crate::catalog::{normalize_label, MatchStrategy, RowSpec, TemplateDefinition};
use crate::config::ExtractionConfig;
use crate::error::Result;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

lazy_static! {
    static ref RE_EU_PREFIX: Regex = Regex::new(r"(?i)^\s*eu[\s\-]*").unwrap();
}

/// Optional `EU` marker in front of a printed identifier.
const EU_MARKER: &str = r"^\s*(?:EU[\s\-]?)?";
/// Separator tolerated between label words.
const WORD_SEPARATOR: &str = r"[\s\p{P}]*";
/// Shortest cell text accepted as a truncated label.
const MIN_CELL_LABEL_LEN: usize = 6;

/// Where a matcher hit a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    /// Byte offset just past the matched identifier and/or label
    pub end: usize,
    /// The label prefix was found
    pub label_matched: bool,
}

/// How completely a cell carries a row's label.
///
/// Variants are ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LabelFit {
    /// The cell starts with the truncated label prefix only
    Prefix,
    /// The cell is a truncation of the full label
    Truncated,
    /// The cell holds the full label followed by more text
    Extended,
    /// The cell is the full label
    Exact,
}

/// Rank of a label match; the fit decides first, then the number of
/// leading characters the cell shares with the full label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelScore {
    /// Kind of match
    pub fit: LabelFit,
    /// Leading characters shared with the full label
    pub shared: usize,
}

/// Compiled matcher for one template row.
#[derive(Debug, Clone)]
pub struct RowMatcher {
    row: RowSpec,
    id_core: String,
    id_pattern: Regex,
    id_label_pattern: Option<Regex>,
    label_pattern: Option<Regex>,
    label_key: String,
    label_full: String,
}

impl RowMatcher {
    /// Compile a matcher for `row`, using at most `label_prefix_len`
    /// characters of its label.
    pub fn new(row: &RowSpec, label_prefix_len: usize) -> Result<Self> {
        let id_core: String = RE_EU_PREFIX
            .replace(&row.row_id, "")
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let id_body = id_core
            .chars()
            .map(|c| regex::escape(&c.to_string()))
            .collect::<Vec<_>>()
            .join(r"\s?");
        let id_regex = format!(r"{}{}\b", EU_MARKER, id_body);

        let words = label_prefix_words(&row.expected_label, label_prefix_len);
        let label_body = words
            .iter()
            .map(|w| word_pattern(w))
            .collect::<Vec<_>>()
            .join(WORD_SEPARATOR);

        let (id_label_pattern, label_pattern) = if label_body.is_empty() {
            (None, None)
        } else {
            (
                Some(build(&format!(r"{}{}{}", id_regex, WORD_SEPARATOR, label_body))?),
                Some(build(&format!(r"\b{}", label_body))?),
            )
        };

        Ok(Self {
            row: row.clone(),
            id_pattern: build(&id_regex)?,
            id_core,
            id_label_pattern,
            label_pattern,
            label_key: squash(&words.join(" ")),
            label_full: squash(&row.expected_label),
        })
    }

    /// The row this matcher recognizes.
    pub fn row(&self) -> &RowSpec {
        &self.row
    }

    /// Row identifier.
    pub fn row_id(&self) -> &str {
        &self.row.row_id
    }

    /// Identifier without its `EU` marker, lowercase ("7a").
    pub fn id_core(&self) -> &str {
        &self.id_core
    }

    /// Match a reconstructed line according to the row's strategy.
    pub fn match_line(&self, line: &str) -> Option<LineMatch> {
        match self.row.matcher {
            MatchStrategy::ExactId => {
                let id_end = self.starts_with_id(line)?;
                let label_end = self
                    .label_pattern
                    .as_ref()
                    .and_then(|re| re.find(&line[id_end..]))
                    .map(|m| id_end + m.end());
                Some(LineMatch {
                    end: label_end.unwrap_or(id_end),
                    label_matched: label_end.is_some(),
                })
            },
            MatchStrategy::IdWithLabel => match &self.id_label_pattern {
                Some(re) => re.find(line).map(|m| LineMatch {
                    end: m.end(),
                    label_matched: true,
                }),
                None => self.starts_with_id(line).map(|end| LineMatch {
                    end,
                    label_matched: false,
                }),
            },
            MatchStrategy::LabelOnly => self.label_pattern.as_ref()?.find(line).map(|m| LineMatch {
                end: m.end(),
                label_matched: true,
            }),
        }
    }

    /// End offset of the row identifier when `line` starts with it.
    ///
    /// An identifier followed by a separator and a digit ("1,234") is a
    /// number, not an identifier.
    pub fn starts_with_id(&self, line: &str) -> Option<usize> {
        let end = self.id_pattern.find(line)?.end();
        let mut rest = line[end..].chars();
        if matches!(rest.next(), Some('.' | ',')) && rest.next().is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(end)
    }

    /// True when a table cell carries this row's label (or a truncation of it).
    pub fn matches_cell(&self, cell: &str) -> bool {
        self.label_score(cell).is_some()
    }

    /// Score how well a table cell carries this row's label.
    pub fn label_score(&self, cell: &str) -> Option<LabelScore> {
        self.score_squashed(&squash(cell))
    }

    fn score_squashed(&self, cell: &str) -> Option<LabelScore> {
        if self.label_key.is_empty() || cell.is_empty() {
            return None;
        }
        let fit = if cell == self.label_full {
            LabelFit::Exact
        } else if cell.starts_with(&self.label_full) {
            LabelFit::Extended
        } else if cell.len() >= MIN_CELL_LABEL_LEN && self.label_full.starts_with(cell) {
            LabelFit::Truncated
        } else if cell.starts_with(&self.label_key) {
            LabelFit::Prefix
        } else {
            return None;
        };
        let shared = cell
            .chars()
            .zip(self.label_full.chars())
            .take_while(|(a, b)| a == b)
            .count();
        Some(LabelScore { fit, shared })
    }
}

/// A template with its row matchers compiled.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    definition: TemplateDefinition,
    matchers: Vec<RowMatcher>,
}

impl CompiledTemplate {
    /// Compile matchers for every row of `definition`.
    pub fn compile(definition: &TemplateDefinition, config: &ExtractionConfig) -> Result<Self> {
        let matchers = definition
            .rows()
            .map(|row| RowMatcher::new(row, config.label_prefix_len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            definition: definition.clone(),
            matchers,
        })
    }

    /// The template definition.
    pub fn definition(&self) -> &TemplateDefinition {
        &self.definition
    }

    /// Template code.
    pub fn code(&self) -> &str {
        &self.definition.code
    }

    /// Matchers in catalog row order.
    pub fn matchers(&self) -> &[RowMatcher] {
        &self.matchers
    }

    /// Matcher of a row.
    pub fn matcher(&self, row_id: &str) -> Option<&RowMatcher> {
        self.matchers.iter().find(|m| m.row_id() == row_id)
    }

    /// The most specific matcher hitting `line`: a confirmed label beats a
    /// bare identifier, then the longer match wins.
    pub fn best_line_match(&self, line: &str) -> Option<(&RowMatcher, LineMatch)> {
        self.matchers
            .iter()
            .filter_map(|m| m.match_line(line).map(|hit| (m, hit)))
            .max_by_key(|(_, hit)| (hit.label_matched, hit.end))
    }

    /// True when `line` begins any row of this template.
    pub fn starts_any_row(&self, line: &str) -> bool {
        self.matchers.iter().any(|m| match m.row().matcher {
            MatchStrategy::LabelOnly => m.match_line(line).is_some(),
            _ => m.starts_with_id(line).is_some(),
        })
    }

    /// Recover a row from label text alone; the best scoring label wins.
    ///
    /// Rows matched by identifier only never take part. A tie for the best
    /// score is ambiguous and recovers nothing.
    pub fn recover_by_label(&self, label: &str) -> Option<&RowMatcher> {
        self.best_label_match(label).map(|(m, _)| m)
    }

    /// Like [`recover_by_label`](Self::recover_by_label), with the winning score.
    pub fn best_label_match(&self, label: &str) -> Option<(&RowMatcher, LabelScore)> {
        let cell = squash(label);
        let mut best: Option<(&RowMatcher, LabelScore)> = None;
        let mut tied = false;

        for m in self.matchers.iter().filter(|m| m.row().matcher != MatchStrategy::ExactId) {
            let Some(score) = m.score_squashed(&cell) else {
                continue;
            };
            match best {
                Some((_, top)) if score < top => {},
                Some((_, top)) if score == top => tied = true,
                _ => {
                    best = Some((m, score));
                    tied = false;
                },
            }
        }

        if tied {
            log::trace!("{}: label {:?} is ambiguous", self.code(), label);
            return None;
        }
        best
    }
}

fn build(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Leading words of the normalized label, cut at a word boundary so that the
/// prefix stays within `max_len` characters (at least one word is kept).
fn label_prefix_words(label: &str, max_len: usize) -> Vec<String> {
    let normalized = normalize_label(label);
    let mut words = Vec::new();
    let mut len = 0;
    for word in normalized.split(' ').filter(|w| !w.is_empty()) {
        let add = word.chars().count() + usize::from(!words.is_empty());
        if !words.is_empty() && len + add > max_len {
            break;
        }
        len += add;
        words.push(word.to_string());
    }
    words
}

/// Pattern for one label word: stray spaces between characters, `1`/`I` fungible.
fn word_pattern(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            '1' | 'i' => "[1i]".to_string(),
            _ => regex::escape(&c.to_string()),
        })
        .collect::<Vec<_>>()
        .join(r"\s?")
}

/// Normalized label with spaces removed and `1` folded into `i`.
fn squash(text: &str) -> String {
    normalize_label(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '1' { 'i' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;

    fn km1() -> CompiledTemplate {
        let catalog = TemplateCatalog::builtin();
        CompiledTemplate::compile(catalog.get("KM1").unwrap(), &ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_label_prefix_words() {
        let words = label_prefix_words("Common Equity Tier 1 (CET1) capital", 24);
        assert_eq!(words, vec!["common", "equity", "tier", "1"]);
        let words = label_prefix_words("Overwhelminglylongsingleword", 4);
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn test_id_with_label() {
        let template = km1();
        let matcher = template.matcher("1").unwrap();
        let line = "1 Common Equity Tier 1 (CET1) capital 4,921";
        let hit = matcher.match_line(line).unwrap();
        assert!(hit.label_matched);
        assert!(line[hit.end..].contains("4,921"));
        assert!(matcher.match_line("1 Credit risk 4,921").is_none());
    }

    #[test]
    fn test_rendering_artifacts() {
        let template = km1();
        // Stray space inside the identifier, "I" rendered for "1", squashed words
        assert!(template.matcher("EU 7a").unwrap().match_line("EU 7 a Additional own funds 2.5%").is_some());
        assert!(template.matcher("1").unwrap().match_line("1 Common Equity Tier I 4,921").is_some());
        assert!(template.matcher("2").unwrap().match_line("2 Tier1capital 5,400").is_some());
        assert!(template.matcher("16").unwrap().match_line("EU 16a Cash outflows").is_none());
    }

    #[test]
    fn test_numbers_are_not_identifiers() {
        let template = km1();
        assert!(template.matcher("1").unwrap().starts_with_id("1,234 Common").is_none());
        assert!(template.matcher("1").unwrap().starts_with_id("1 Common").is_some());
    }

    #[test]
    fn test_best_line_match_prefers_label() {
        let template = km1();
        let (matcher, _) = template.best_line_match("14 Leverage ratio (%) 5.1%").unwrap();
        assert_eq!(matcher.row_id(), "14");
    }

    #[test]
    fn test_matches_cell() {
        let template = km1();
        let matcher = template.matcher("1").unwrap();
        assert!(matcher.matches_cell("Common Equity Tier 1 (CET1) capital"));
        assert!(matcher.matches_cell("Common equity"));
        assert!(!matcher.matches_cell("Tier 1 capital"));
    }

    #[test]
    fn test_recover_by_label_prefers_full_label() {
        let template = km1();
        assert_eq!(template.recover_by_label("Total capital ratio (%)").unwrap().row_id(), "7");
        assert_eq!(template.recover_by_label("Total capital").unwrap().row_id(), "3");
        assert_eq!(
            template.recover_by_label("Common Equity Tier 1 (CET1) capital").unwrap().row_id(),
            "1"
        );
        assert_eq!(template.recover_by_label("Common Equity Tier 1 capital").unwrap().row_id(), "1");
        assert_eq!(template.recover_by_label("Common Equity Tier 1 ratio").unwrap().row_id(), "5");
    }

    #[test]
    fn test_ambiguous_truncation_recovers_nothing() {
        let template = km1();
        // Both the CET1 amount and the CET1 ratio start this way
        assert!(template.recover_by_label("Common Equity Tier 1").is_none());
        assert!(template.matcher("1").unwrap().matches_cell("Common Equity Tier 1"));
    }

    #[test]
    fn test_label_score_order() {
        let template = km1();
        let total = template.matcher("3").unwrap();
        let ratio = template.matcher("7").unwrap();
        assert_eq!(total.label_score("Total capital").unwrap().fit, LabelFit::Exact);
        assert_eq!(ratio.label_score("Total capital").unwrap().fit, LabelFit::Truncated);
        assert_eq!(total.label_score("Total capital ratio (%)").unwrap().fit, LabelFit::Extended);
        assert!(total.label_score("Tier 1 capital").is_none());
    }
}
