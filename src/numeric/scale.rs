//! Amount scales and ratio re-basing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (inclusive) of the magnitude band treated as percentage points.
pub const RATIO_REBASE_MIN: f64 = 3.0;
/// Upper bound (exclusive) of the magnitude band treated as percentage points.
pub const RATIO_REBASE_MAX: f64 = 100.0;

/// Unit in which a document reports its amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountScale {
    /// Plain units
    #[default]
    Units,
    /// Thousands (`€'000`, "in thousands")
    Thousands,
    /// Millions (`€m`, "in millions")
    Millions,
    /// Billions (`€bn`, "in billions")
    Billions,
}

impl AmountScale {
    /// Multiplier to convert this scale into units.
    pub fn multiplier(&self) -> f64 {
        match self {
            AmountScale::Units => 1.0,
            AmountScale::Thousands => 1_000.0,
            AmountScale::Millions => 1_000_000.0,
            AmountScale::Billions => 1_000_000_000.0,
        }
    }
}

impl fmt::Display for AmountScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AmountScale::Units => "units",
            AmountScale::Thousands => "thousands",
            AmountScale::Millions => "millions",
            AmountScale::Billions => "billions",
        };
        f.write_str(name)
    }
}

/// Convert an amount reported in `from` into the `to` base scale.
///
/// # Examples
///
/// ```
/// use disclosure_oxide::numeric::{apply_scale, AmountScale};
///
/// let v = apply_scale(1500.0, AmountScale::Thousands, AmountScale::Millions);
/// assert!((v - 1.5).abs() < 1e-12);
/// ```
pub fn apply_scale(value: f64, from: AmountScale, to: AmountScale) -> f64 {
    if from == to {
        return value;
    }
    value * from.multiplier() / to.multiplier()
}

/// Re-base a ratio printed in percentage points to a fraction.
///
/// Values whose magnitude lies in `[3, 100)` are divided by 100; everything
/// else, including values already in fractional form, is returned unchanged,
/// so applying this twice is the same as applying it once for fractions.
/// `exempt` rows keep their parsed value.
pub fn rebase_ratio(value: f64, exempt: bool) -> f64 {
    if exempt {
        return value;
    }
    if (RATIO_REBASE_MIN..RATIO_REBASE_MAX).contains(&value.abs()) {
        value / 100.0
    } else {
        value
    }
}
