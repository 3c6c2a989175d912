/// Multi-format date parsing for the survey-date column.
///
/// A column is parsed as a whole: each format in [`DateFormat::ORDERED`]
/// is tried against every non-missing cell, and the first format that
/// accepts all of them is the interpretation for the column. If none
/// does, every cell is parsed on its own with a wider set of patterns and
/// cells that still fail become missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::model::IngestError;

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `2020-01-31T00:00:00`, what the datastore API returns.
    IsoDateTime,
    /// `2020-01-31`, what the local fallback file is written with.
    IsoDate,
    /// `31/01/2020`, the legacy export format.
    DayMonthYear,
    /// `01/31/2020`
    MonthDayYear,
}

impl DateFormat {
    /// Priority order for whole-column parsing.
    pub const ORDERED: [DateFormat; 4] = [
        DateFormat::IsoDateTime,
        DateFormat::IsoDate,
        DateFormat::DayMonthYear,
        DateFormat::MonthDayYear,
    ];

    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::IsoDateTime => "%Y-%m-%dT%H:%M:%S",
            DateFormat::IsoDate => "%Y-%m-%d",
            DateFormat::DayMonthYear => "%d/%m/%Y",
            DateFormat::MonthDayYear => "%m/%d/%Y",
        }
    }

    /// Parses one cell; the whole string must match.
    pub fn parse(self, value: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::IsoDateTime => NaiveDateTime::parse_from_str(value, self.pattern())
                .ok()
                .map(|dt| dt.date()),
            _ => NaiveDate::parse_from_str(value, self.pattern()).ok(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern())
    }
}

/// How a date column ended up being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "format")]
pub enum DateInterpretation {
    /// One format matched every non-missing cell.
    Strict(DateFormat),
    /// No single format matched; cells were parsed individually.
    Permissive,
}

impl fmt::Display for DateInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateInterpretation::Strict(format) => write!(f, "{}", format),
            DateInterpretation::Permissive => write!(f, "permissive auto-detection"),
        }
    }
}

/// Parsed column plus how it was parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDates {
    pub dates: Vec<Option<NaiveDate>>,
    pub interpretation: DateInterpretation,
    /// Non-missing cells that could not be parsed. Always zero for `Strict`.
    pub unparsed: usize,
}

// Tried in order by the permissive parser, after RFC 3339.
const PERMISSIVE_DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const PERMISSIVE_DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses every cell with one format. Missing cells stay missing; the
/// first present cell that does not match fails the whole attempt.
pub fn parse_strict(
    format: DateFormat,
    cells: &[Option<String>],
) -> Result<Vec<Option<NaiveDate>>, IngestError> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(value) => format
                .parse(value)
                .map(Some)
                .ok_or_else(|| IngestError::DateParseFailure {
                    format: format.pattern(),
                    value: value.clone(),
                }),
        })
        .collect()
}

/// Best-effort parse of a single cell.
pub fn parse_permissive(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for pattern in PERMISSIVE_DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(dt.date());
        }
    }
    PERMISSIVE_DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(value, pattern).ok())
}

/// Parses a date column, trying each strict format before falling back to
/// per-cell permissive parsing.
pub fn parse_date_column(cells: &[Option<String>]) -> ParsedDates {
    for format in DateFormat::ORDERED {
        match parse_strict(format, cells) {
            Ok(dates) => {
                return ParsedDates {
                    dates,
                    interpretation: DateInterpretation::Strict(format),
                    unparsed: 0,
                };
            }
            Err(e) => tracing::debug!(%format, error = %e, "date format rejected"),
        }
    }

    let dates: Vec<Option<NaiveDate>> = cells
        .iter()
        .map(|cell| cell.as_deref().and_then(parse_permissive))
        .collect();
    let unparsed = cells
        .iter()
        .zip(&dates)
        .filter(|(cell, date)| cell.is_some() && date.is_none())
        .count();

    ParsedDates {
        dates,
        interpretation: DateInterpretation::Permissive,
        unparsed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_api_timestamps_use_iso_datetime() {
        let parsed = parse_date_column(&cells(&[
            Some("2024-03-26T00:00:00"),
            Some("2024-03-27T00:00:00"),
        ]));
        assert_eq!(parsed.interpretation, DateInterpretation::Strict(DateFormat::IsoDateTime));
        assert_eq!(parsed.dates, vec![Some(d(2024, 3, 26)), Some(d(2024, 3, 27))]);
    }

    #[test]
    fn test_iso_date_rejects_trailing_time() {
        assert!(DateFormat::IsoDate.parse("2024-03-26T00:00:00").is_none());
        assert_eq!(DateFormat::IsoDate.parse("2024-03-26"), Some(d(2024, 3, 26)));
    }

    #[test]
    fn test_ambiguous_slashes_prefer_day_first() {
        let parsed = parse_date_column(&cells(&[Some("01/02/2020"), Some("03/02/2020")]));
        assert_eq!(parsed.interpretation, DateInterpretation::Strict(DateFormat::DayMonthYear));
        assert_eq!(parsed.dates[0], Some(d(2020, 2, 1)));
    }

    #[test]
    fn test_month_first_chosen_when_day_first_impossible() {
        // 12/31/2020 cannot be day-first, so the whole column is month-first.
        let parsed = parse_date_column(&cells(&[Some("01/02/2020"), Some("12/31/2020")]));
        assert_eq!(parsed.interpretation, DateInterpretation::Strict(DateFormat::MonthDayYear));
        assert_eq!(parsed.dates[0], Some(d(2020, 1, 2)));
    }

    #[test]
    fn test_missing_cells_do_not_break_strict_formats() {
        let parsed = parse_date_column(&cells(&[Some("2020-01-01"), None, Some("2020-01-03")]));
        assert_eq!(parsed.interpretation, DateInterpretation::Strict(DateFormat::IsoDate));
        assert_eq!(parsed.dates[1], None);
        assert_eq!(parsed.unparsed, 0);
    }

    #[test]
    fn test_mixed_column_falls_back_to_permissive() {
        let parsed = parse_date_column(&cells(&[
            Some("2020-01-01"),
            Some("2020-01-02T06:30:00.500"),
            Some("not a date"),
            None,
        ]));
        assert_eq!(parsed.interpretation, DateInterpretation::Permissive);
        assert_eq!(parsed.dates[0], Some(d(2020, 1, 1)));
        assert_eq!(parsed.dates[1], Some(d(2020, 1, 2)));
        assert_eq!(parsed.dates[2], None);
        assert_eq!(parsed.unparsed, 1, "only the present-but-garbled cell counts");
    }

    #[test]
    fn test_strict_attempt_reports_offending_value() {
        let err = parse_strict(DateFormat::IsoDate, &cells(&[Some("31/12/2020")])).unwrap_err();
        match err {
            IngestError::DateParseFailure { format, value } => {
                assert_eq!(format, "%Y-%m-%d");
                assert_eq!(value, "31/12/2020");
            }
            other => panic!("expected DateParseFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_permissive_accepts_rfc3339_and_dotted_dates() {
        assert_eq!(parse_permissive("2021-07-04T10:00:00+03:00"), Some(d(2021, 7, 4)));
        assert_eq!(parse_permissive("04.07.2021"), Some(d(2021, 7, 4)));
        assert_eq!(parse_permissive(" 2021/07/04 "), Some(d(2021, 7, 4)));
        assert_eq!(parse_permissive("yesterday"), None);
    }
}
