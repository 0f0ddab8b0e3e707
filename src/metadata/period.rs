//! Reporting period detection.
//!
//! Recognizers are tried in priority order and the first match wins:
//! "as at 31 December 2023", "31 December 2023", "December 31, 2023",
//! numeric dates (`31.12.2023`, `31/12/2023`), ISO dates, quarters
//! (`Q2 2024`, `2Q 2024`), half years (`H1 2024`) and finally a bare year,
//! which resolves to 31 December.

use super::{Detection, FallbackReason};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

lazy_static! {
    static ref RE_AS_AT_DAY_MONTH: Regex = Regex::new(&format!(
        r"(?i)\bas\s+(?:at|of|on)\s+(\d{{1,2}})(?:st|nd|rd|th)?\s+{}\.?\s+(\d{{4}})\b",
        MONTHS
    ))
    .unwrap();

    static ref RE_AS_AT_MONTH_DAY: Regex = Regex::new(&format!(
        r"(?i)\bas\s+(?:at|of|on)\s+{}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b",
        MONTHS
    ))
    .unwrap();

    static ref RE_DAY_MONTH: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{}\.?\s+(\d{{4}})\b",
        MONTHS
    ))
    .unwrap();

    static ref RE_MONTH_DAY: Regex = Regex::new(&format!(
        r"(?i)\b{}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,\s*(\d{{4}})\b",
        MONTHS
    ))
    .unwrap();

    static ref RE_NUMERIC_DATE: Regex =
        Regex::new(r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b").unwrap();

    static ref RE_ISO_DATE: Regex = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap();

    static ref RE_QUARTER: Regex =
        Regex::new(r"(?i)\b(?:Q([1-4])|([1-4])Q)[\s/\-]*((?:19|20)\d{2})\b").unwrap();

    static ref RE_HALF: Regex =
        Regex::new(r"(?i)\b(?:H([12])|([12])H)[\s/\-]*((?:19|20)\d{2})\b").unwrap();

    static ref RE_YEAR: Regex = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();
}

type Recognizer = fn(&str) -> Option<NaiveDate>;

/// Recognizers in priority order.
const RECOGNIZERS: &[Recognizer] = &[
    as_at_date,
    long_date,
    numeric_date,
    iso_date,
    quarter_end,
    half_year_end,
    bare_year,
];

/// Detect the reporting period from `text`, falling back to a period in the
/// file identifier and then to `default`.
pub fn detect_period(text: &str, file_id: &str, default: NaiveDate) -> Detection<NaiveDate> {
    if let Some(date) = find_period(text) {
        return Detection::detected(date);
    }
    // Underscores are word characters and would hide years from `\b`
    let file_text = file_id.replace('_', " ");
    if let Some(date) = find_period(&file_text) {
        return Detection::fallback(date, FallbackReason::FromFileName);
    }
    Detection::fallback(default, FallbackReason::Default)
}

/// First date found by the recognizer ladder.
pub fn find_period(text: &str) -> Option<NaiveDate> {
    RECOGNIZERS.iter().find_map(|recognize| recognize(text))
}

fn as_at_date(text: &str) -> Option<NaiveDate> {
    RE_AS_AT_DAY_MONTH
        .captures(text)
        .and_then(|c| ymd(&c, 3, 2, 1))
        .or_else(|| RE_AS_AT_MONTH_DAY.captures(text).and_then(|c| ymd(&c, 3, 1, 2)))
}

fn long_date(text: &str) -> Option<NaiveDate> {
    RE_DAY_MONTH
        .captures_iter(text)
        .find_map(|c| ymd(&c, 3, 2, 1))
        .or_else(|| RE_MONTH_DAY.captures_iter(text).find_map(|c| ymd(&c, 3, 1, 2)))
}

fn numeric_date(text: &str) -> Option<NaiveDate> {
    RE_NUMERIC_DATE.captures_iter(text).find_map(|c| {
        let a: u32 = c[1].parse().ok()?;
        let b: u32 = c[2].parse().ok()?;
        let year: i32 = c[3].parse().ok()?;
        // Day first; month first only when the day-first reading is impossible
        NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
    })
}

fn iso_date(text: &str) -> Option<NaiveDate> {
    RE_ISO_DATE.captures_iter(text).find_map(|c| {
        NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
    })
}

fn quarter_end(text: &str) -> Option<NaiveDate> {
    let c = RE_QUARTER.captures(text)?;
    let quarter: u32 = c.get(1).or_else(|| c.get(2))?.as_str().parse().ok()?;
    month_end(c[3].parse().ok()?, quarter * 3)
}

fn half_year_end(text: &str) -> Option<NaiveDate> {
    let c = RE_HALF.captures(text)?;
    let half: u32 = c.get(1).or_else(|| c.get(2))?.as_str().parse().ok()?;
    month_end(c[3].parse().ok()?, half * 6)
}

fn bare_year(text: &str) -> Option<NaiveDate> {
    let year: i32 = RE_YEAR.captures(text)?[1].parse().ok()?;
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// Build a date from captures holding year, month name and day.
fn ymd(c: &Captures, year: usize, month: usize, day: usize) -> Option<NaiveDate> {
    let month = month_number(c.get(month)?.as_str())?;
    NaiveDate::from_ymd_opt(c[year].parse().ok()?, month, c[day].parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).flat_map(char::to_lowercase).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Last day of `month` in `year`.
fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}
