//! Amount scale detection from unit declarations.

use super::{Detection, FallbackReason};
use crate::numeric::AmountScale;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_THOUSANDS: Regex = Regex::new(
        r"(?i)(?:\bthousands?\b|(?:[€$£]|\b(?:eur|usd|gbp|chf))\s?'?000\b|(?:[€$£]|\b(?:eur|usd|gbp|chf))\s?k\b|\bteur\b|\btsd\b)"
    )
    .unwrap();

    static ref RE_MILLIONS: Regex = Regex::new(
        r"(?i)(?:\bmillions?\b|(?:[€$£]|\b(?:eur|usd|gbp|chf))\s?(?:m|mn|mln|mio)\b)"
    )
    .unwrap();

    static ref RE_BILLIONS: Regex = Regex::new(
        r"(?i)(?:\bbillions?\b|(?:[€$£]|\b(?:eur|usd|gbp|chf))\s?(?:bn|b)\b)"
    )
    .unwrap();
}

/// Detect the amount scale from the earliest unit declaration in `text`.
///
/// Defaults to [`AmountScale::Units`] when nothing matches.
pub fn detect_scale(text: &str) -> Detection<AmountScale> {
    [
        (AmountScale::Thousands, &*RE_THOUSANDS),
        (AmountScale::Millions, &*RE_MILLIONS),
        (AmountScale::Billions, &*RE_BILLIONS),
    ]
    .iter()
    .filter_map(|(scale, re)| re.find(text).map(|m| (m.start(), *scale)))
    .min_by_key(|(start, _)| *start)
    .map(|(_, scale)| Detection::detected(scale))
    .unwrap_or_else(|| Detection::fallback(AmountScale::Units, FallbackReason::Default))
}
