//! Date normalization.
//!
//! Raw interchange dates become a sortable calendar date, an optional range
//! end and a precision tag. Normalization never fails: anything outside the
//! grammar is `unknown` with no sort date.

use crate::types::DatePrecision;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

// Literal patterns, forced by `patterns_compile` below.
/// Qualifier grammars, tried in order before the bare core date.
#[allow(clippy::expect_used)]
static QUALIFIED: LazyLock<Vec<(Regex, DatePrecision)>> = LazyLock::new(|| {
    [
        (r"(?i)^(?:BET|BETWEEN)\s+(.+?)\s+AND\s+(.+)$", DatePrecision::Range),
        (r"(?i)^FROM\s+(.+?)\s+TO\s+(.+)$", DatePrecision::Range),
        (
            r"(?i)^(?:ABT|ABOUT|EST|ESTIMATED|CAL|CALCULATED)\s+(.+)$",
            DatePrecision::Estimated,
        ),
        (r"(?i)^(?:BEF|BEFORE)\s+(.+)$", DatePrecision::Before),
        (r"(?i)^(?:AFT|AFTER)\s+(.+)$", DatePrecision::After),
    ]
    .into_iter()
    .map(|(pattern, precision)| (Regex::new(pattern).expect("valid date regex"), precision))
    .collect()
});

/// `[day] [month] year`
#[allow(clippy::expect_used)]
static CORE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(\d{1,2})\s+)?(?:([A-Z]{3})\s+)?(\d{3,4})$").expect("valid core regex")
});

/// Result of [`normalize_date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    /// Earliest plausible calendar date.
    pub sort: Option<NaiveDate>,
    /// End of a `BET`/`FROM` range.
    pub end: Option<NaiveDate>,
    pub precision: DatePrecision,
}

impl NormalizedDate {
    pub const UNKNOWN: Self = Self {
        sort: None,
        end: None,
        precision: DatePrecision::Unknown,
    };
}

pub fn normalize_date(raw: &str) -> NormalizedDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return NormalizedDate::UNKNOWN;
    }

    for (pattern, precision) in QUALIFIED.iter() {
        let Some(caps) = pattern.captures(raw) else {
            continue;
        };
        let first = caps.get(1).and_then(|m| parse_core_date(m.as_str()));
        let end = match precision {
            DatePrecision::Range => caps.get(2).and_then(|m| parse_core_date(m.as_str())),
            _ => None,
        };
        return NormalizedDate {
            sort: first.map(|(date, _)| date),
            end: end.map(|(date, _)| date),
            precision: *precision,
        };
    }

    match parse_core_date(raw) {
        Some((date, precision)) => NormalizedDate {
            sort: Some(date),
            end: None,
            precision,
        },
        None => NormalizedDate::UNKNOWN,
    }
}

/// Parse a core date into its calendar date and shape precision.
///
/// Unknown month tokens read as January. Days past the month end are clamped
/// to 28 (February) or 31, and a date that is still invalid falls back to the
/// first of the month.
fn parse_core_date(text: &str) -> Option<(NaiveDate, DatePrecision)> {
    let caps = CORE_DATE.captures(text.trim())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let month_token = caps.get(2).map(|m| m.as_str().to_ascii_uppercase());
    let day_token = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());

    let month = month_token
        .as_deref()
        .and_then(|token| MONTHS.iter().position(|name| *name == token))
        .map_or(1, |index| index as u32 + 1);
    let day = day_token.unwrap_or(1).min(if month == 2 { 28 } else { 31 });

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))?;

    let precision = match (day_token, month_token) {
        (Some(_), Some(_)) => DatePrecision::Exact,
        (_, Some(_)) => DatePrecision::Month,
        _ => DatePrecision::Year,
    };
    Some((date, precision))
}

/// Render a sort date in the interchange core form for its precision.
///
/// `exact` gives `5 MAR 1901`, `month` gives `MAR 1901`, `year` gives `1901`.
/// Precisions without a core shape render the full day form.
pub fn format_core_date(date: NaiveDate, precision: DatePrecision) -> String {
    let month = MONTHS
        .get(date.month0() as usize)
        .copied()
        .unwrap_or("JAN");
    match precision {
        DatePrecision::Month => format!("{} {}", month, date.year()),
        DatePrecision::Year => date.year().to_string(),
        _ => format!("{} {} {}", date.day(), month, date.year()),
    }
}

/// Sort key placing unknown dates after every known one.
pub fn sort_key(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(unknown_sort_date)
}

fn unknown_sort_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert_eq!(LazyLock::force(&QUALIFIED).len(), 5);
        assert!(LazyLock::force(&CORE_DATE).is_match("12 MAR 1850"));
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn bare_core_dates() {
        let exact = normalize_date("5 MAR 1901");
        assert_eq!(exact.sort, Some(ymd(1901, 3, 5)));
        assert_eq!(exact.precision, DatePrecision::Exact);

        let month = normalize_date("mar 1901");
        assert_eq!(month.sort, Some(ymd(1901, 3, 1)));
        assert_eq!(month.precision, DatePrecision::Month);

        let year = normalize_date("1901");
        assert_eq!(year.sort, Some(ymd(1901, 1, 1)));
        assert_eq!(year.precision, DatePrecision::Year);
    }

    #[test]
    fn qualified_dates() {
        let about = normalize_date("ABT 1850");
        assert_eq!(about.precision, DatePrecision::Estimated);
        assert_eq!(about.sort, Some(ymd(1850, 1, 1)));

        assert_eq!(normalize_date("about 1850").precision, DatePrecision::Estimated);
        assert_eq!(normalize_date("CAL 1850").precision, DatePrecision::Estimated);
        assert_eq!(normalize_date("BEF 1900").precision, DatePrecision::Before);
        assert_eq!(normalize_date("Before 1900").precision, DatePrecision::Before);
        assert_eq!(normalize_date("AFT 3 JUN 1900").sort, Some(ymd(1900, 6, 3)));
    }

    #[test]
    fn ranges_carry_end_date() {
        let between = normalize_date("BET 1900 AND 1910");
        assert_eq!(between.precision, DatePrecision::Range);
        assert_eq!(between.sort, Some(ymd(1900, 1, 1)));
        assert_eq!(between.end, Some(ymd(1910, 1, 1)));

        let from = normalize_date("FROM MAR 1900 TO 2 APR 1901");
        assert_eq!(from.sort, Some(ymd(1900, 3, 1)));
        assert_eq!(from.end, Some(ymd(1901, 4, 2)));
    }

    #[test]
    fn qualifier_with_bad_core_keeps_precision() {
        let result = normalize_date("ABT sometime");
        assert_eq!(result.precision, DatePrecision::Estimated);
        assert_eq!(result.sort, None);
    }

    #[test]
    fn days_are_clamped_or_fall_back() {
        assert_eq!(normalize_date("31 FEB 1900").sort, Some(ymd(1900, 2, 28)));
        assert_eq!(normalize_date("31 APR 1900").sort, Some(ymd(1900, 4, 1)));
        assert_eq!(normalize_date("45 JAN 1900").sort, Some(ymd(1900, 1, 31)));
    }

    #[test]
    fn unknown_month_reads_as_january() {
        let result = normalize_date("XYZ 1900");
        assert_eq!(result.sort, Some(ymd(1900, 1, 1)));
        assert_eq!(result.precision, DatePrecision::Month);
    }

    #[test]
    fn unparseable_is_unknown() {
        assert_eq!(normalize_date(""), NormalizedDate::UNKNOWN);
        assert_eq!(normalize_date("   "), NormalizedDate::UNKNOWN);
        assert_eq!(normalize_date("spring of 1900"), NormalizedDate::UNKNOWN);
        assert_eq!(normalize_date("19"), NormalizedDate::UNKNOWN);
    }

    #[test]
    fn format_matches_precision() {
        let date = ymd(1901, 3, 5);
        assert_eq!(format_core_date(date, DatePrecision::Exact), "5 MAR 1901");
        assert_eq!(format_core_date(date, DatePrecision::Month), "MAR 1901");
        assert_eq!(format_core_date(date, DatePrecision::Year), "1901");
    }

    #[test]
    fn unknown_sorts_last() {
        let known = sort_key(Some(ymd(2100, 1, 1)));
        let unknown = sort_key(None);
        assert!(known < unknown);
        assert_eq!(unknown, ymd(9999, 12, 31));
    }
}
