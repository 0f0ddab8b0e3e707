//! Numeric normalization for disclosure values.
//!
//! Disclosure documents print the same quantity in many ways: `1.234,56`,
//! `1,234.56`, `(1,234)`, `18,93%`, `—45`, `€ 4 921`. This module turns such
//! strings into canonical `f64` values and finds numeric tokens inside lines
//! of text.
//!
//! Separator policy, in order:
//! 1. When both `,` and `.` occur, the rightmost one is the decimal marker.
//! 2. A separator that occurs more than once is a thousands separator.
//! 3. A lone `.` followed by exactly three digits is a thousands separator
//!    unless the value is parsed in ratio context.
//! 4. A lone `,` followed by exactly three digits is a thousands separator,
//!    otherwise a decimal marker.
//!
//! Rules 3 and 4 never fire when the integer part is zero or longer than three
//! digits (`0.125`, `1234.567`). Rule 3 is an approximation: `4.921` is
//! genuinely ambiguous and is read as `4921` for amounts.

mod scale;

pub use scale::{apply_scale, rebase_ratio, AmountScale, RATIO_REBASE_MAX, RATIO_REBASE_MIN};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Candidate numeric tokens: optional parenthesis, dash sign and currency,
    /// digit groups with separators, optional percent.
    static ref RE_NUMERIC: Regex = Regex::new(
        r"\(?[-\u{2212}\u{2013}\u{2014}]?(?:[€$£]\s?)?\d+(?:[.,'\u{a0}\u{202f}]\d+)*\s?%?\)?"
    )
    .unwrap();
}

/// Parsing context for a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberContext {
    /// The value belongs to a ratio row; disables the dot-thousands rule.
    pub ratio: bool,
}

impl NumberContext {
    /// Context for amount rows.
    pub fn amount() -> Self {
        Self { ratio: false }
    }

    /// Context for ratio rows.
    pub fn ratio() -> Self {
        Self { ratio: true }
    }
}

/// Parse a numeric string in amount context.
///
/// # Examples
///
/// ```
/// use disclosure_oxide::numeric::parse_number;
///
/// assert_eq!(parse_number("1.234,56"), Some(1234.56));
/// assert_eq!(parse_number("(1,234)"), Some(-1234.0));
/// assert_eq!(parse_number("n/a"), None);
/// ```
pub fn parse_number(raw: &str) -> Option<f64> {
    parse_number_in(raw, NumberContext::amount())
}

/// Parse a numeric string under an explicit context.
///
/// Returns `None` for anything that is not a number; callers drop the
/// candidate rather than failing.
pub fn parse_number_in(raw: &str, ctx: NumberContext) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\'' | '\u{2019}' | '*'))
        .collect();
    if compact.is_empty() {
        return None;
    }

    let is_percent = compact.contains('%');
    let mut body = compact.as_str();
    let stripped_percent;
    if is_percent {
        stripped_percent = body.replace('%', "");
        body = stripped_percent.as_str();
    }

    let mut negative = false;
    if body.len() >= 2 && body.starts_with('(') && body.ends_with(')') {
        negative = true;
        body = &body[1..body.len() - 1];
    }

    // Leading signs and currency symbols, in any order ("-€45", "€-45")
    while let Some(first) = body.chars().next() {
        match first {
            '-' | '\u{2212}' | '\u{2013}' | '\u{2014}' => negative = true,
            '+' | '€' | '$' | '£' | '¥' => {},
            _ => break,
        }
        body = &body[first.len_utf8()..];
    }

    if body.is_empty()
        || !body.chars().any(|c| c.is_ascii_digit())
        || !body.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return None;
    }

    let canonical = resolve_separators(body, ctx)?;
    let mut value: f64 = canonical.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if negative {
        value = -value;
    }
    if is_percent {
        value /= 100.0;
    }
    Some(value)
}

/// Rewrite `body` (digits, `,` and `.` only) into a Rust-parseable decimal.
fn resolve_separators(body: &str, ctx: NumberContext) -> Option<String> {
    match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                Some(body.replace('.', "").replace(',', "."))
            } else {
                Some(body.replace(',', ""))
            }
        },
        (Some(_), None) => resolve_single_separator(body, ',', ctx),
        (None, Some(_)) => resolve_single_separator(body, '.', ctx),
        (None, None) => Some(body.to_string()),
    }
}

fn resolve_single_separator(body: &str, sep: char, ctx: NumberContext) -> Option<String> {
    let groups: Vec<&str> = body.split(sep).collect();

    if groups.len() > 2 {
        // Repeated separator: thousands grouping, which must be well formed
        let first_ok = (1..=3).contains(&groups[0].len());
        let rest_ok = groups[1..].iter().all(|g| g.len() == 3);
        return if first_ok && rest_ok {
            Some(groups.concat())
        } else {
            None
        };
    }

    let (int_part, frac) = (groups[0], groups[1]);
    let int_is_zero = int_part.chars().all(|c| c == '0');
    let groupable = frac.len() == 3 && !int_is_zero && int_part.len() <= 3;
    let thousands = match sep {
        '.' => groupable && !ctx.ratio,
        _ => groupable,
    };

    if thousands {
        Some(format!("{}{}", int_part, frac))
    } else if frac.is_empty() {
        Some(int_part.to_string())
    } else {
        Some(format!("{}.{}", if int_part.is_empty() { "0" } else { int_part }, frac))
    }
}

/// A numeric token located inside a line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericToken {
    /// Token text as printed (trimmed)
    pub text: String,
    /// Byte offset of the token start in the line
    pub start: usize,
    /// Byte offset one past the token end in the line
    pub end: usize,
    /// Token carries a percent marker
    pub is_percent: bool,
    /// Token carries a decimal or grouping separator
    pub has_separator: bool,
}

impl NumericToken {
    /// Parse this token under `ctx`.
    pub fn value(&self, ctx: NumberContext) -> Option<f64> {
        parse_number_in(&self.text, ctx)
    }

    /// True for a bare small integer such as `13`: no separator, no percent,
    /// at most three digits. Such tokens may be row identifiers or footnotes.
    pub fn is_bare_small_integer(&self) -> bool {
        !self.is_percent
            && !self.has_separator
            && self.text.len() <= 3
            && self.text.chars().all(|c| c.is_ascii_digit())
    }
}

/// Find word-bounded numeric tokens in `line`, left to right.
///
/// Digits glued to letters (`CET1`, `4a`, `EU-3`) are not numeric tokens.
pub fn scan_numeric_tokens(line: &str) -> Vec<NumericToken> {
    let mut tokens = Vec::new();

    for m in RE_NUMERIC.find_iter(line) {
        let mut start = m.start();
        let mut end = m.end();
        let mut text = m.as_str();

        let leading = text.len() - text.trim_start().len();
        start += leading;
        text = &text[leading..];

        // Unbalanced parentheses belong to the surrounding prose
        if text.starts_with('(') && !text.ends_with(')') {
            start += 1;
            text = &text[1..];
        } else if text.ends_with(')') && !text.starts_with('(') {
            end -= 1;
            text = &text[..text.len() - 1];
        }
        let trimmed_end = text.trim_end().len();
        end -= text.len() - trimmed_end;
        text = &text[..trimmed_end];

        let before = line[..start].chars().next_back();
        if before.is_some_and(|c| c.is_alphanumeric() || c == '.' || c == ',' || c == '-') {
            continue;
        }
        let after = line[end..].chars().next();
        if after.is_some_and(|c| c.is_alphanumeric()) {
            continue;
        }

        if parse_number(text).is_none() {
            continue;
        }

        tokens.push(NumericToken {
            text: text.to_string(),
            start,
            end,
            is_percent: text.contains('%'),
            has_separator: text.contains(['.', ',', '\u{a0}', '\u{202f}', '\'']),
        });
    }

    tokens
}

/// True when the next non-space character after `offset` starts a word.
///
/// Numbers followed by words are label fragments ("Tier 1 capital"), not
/// reported values.
pub fn is_followed_by_word(line: &str, offset: usize) -> bool {
    line.get(offset..)
        .and_then(|rest| rest.trim_start().chars().next())
        .is_some_and(|c| c.is_alphabetic())
}
