/// Schema normalization: untrusted datastore records → validated `Series`.
///
/// Submodules:
/// - `columns` — candidate-term column discovery.
/// - `dates`   — ordered multi-format date parsing with permissive fallback.
///
/// The pipeline is: discover the date and level columns, coerce levels to
/// `f64` (failures become missing), parse the date column, drop rows that
/// are missing either value, then sort and de-duplicate through
/// `Series::from_unsorted`. Every count along the way ends up in the
/// returned `NormalizeReport`; none of them abort the load.

pub mod columns;
pub mod dates;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{IngestError, Notice, RawRecord, Reading, Series};
use columns::{field_names, match_column, ColumnCandidates};
use dates::{parse_date_column, DateInterpretation};

/// What the normalizer saw and decided, for logging and dashboard notices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub total_records: usize,
    pub date_column: String,
    pub level_column: String,
    pub date_interpretation: DateInterpretation,
    /// Level cells that were absent, null, or not numeric.
    pub missing_levels: usize,
    /// Date cells that were present but matched no pattern.
    pub unparsed_dates: usize,
    /// Rows dropped because the date or the level was missing.
    pub dropped_rows: usize,
    /// Rows removed because a later record had the same date.
    pub duplicate_dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl NormalizeReport {
    /// Dashboard-facing summary of the report.
    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = vec![
            Notice::info(format!("Found {} records in the dataset", self.total_records)),
            Notice::info(format!(
                "Date column '{}' ({}), water level column '{}'",
                self.date_column, self.date_interpretation, self.level_column
            )),
        ];
        if self.unparsed_dates > 0 {
            notices.push(Notice::warning(format!(
                "{} dates could not be parsed",
                self.unparsed_dates
            )));
        }
        if self.missing_levels > 0 {
            notices.push(Notice::warning(format!(
                "{} water level values are missing or not numeric",
                self.missing_levels
            )));
        }
        if self.dropped_rows > 0 {
            notices.push(Notice::warning(format!(
                "Dropped {} rows with missing data",
                self.dropped_rows
            )));
        }
        if self.duplicate_dates > 0 {
            notices.push(Notice::warning(format!(
                "Kept the last of several records for {} duplicate dates",
                self.duplicate_dates
            )));
        }
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            notices.push(Notice::info(format!("Date range: {} to {}", first, last)));
        }
        notices
    }
}

/// Normalizes raw datastore records into a `Series`.
///
/// # Errors
/// - `IngestError::SchemaMismatch` — no field matched the date or the level
///   candidates.
pub fn normalize_records(
    records: &[RawRecord],
    candidates: &ColumnCandidates,
) -> Result<(Series, NormalizeReport), IngestError> {
    let available = field_names(records);

    let date_column = match_column(&candidates.date_terms, &available)
        .ok_or_else(|| schema_mismatch("date", &available))?
        .to_string();
    let level_column = match_column(&candidates.level_terms, &available)
        .ok_or_else(|| schema_mismatch("water level", &available))?
        .to_string();
    info!(date_column = %date_column, level_column = %level_column, "identified columns");

    let levels: Vec<Option<f64>> = records
        .iter()
        .map(|r| coerce_level(r.get(&level_column)))
        .collect();
    let missing_levels = levels.iter().filter(|l| l.is_none()).count();
    if missing_levels > 0 {
        warn!(count = missing_levels, column = %level_column, "water level values missing or not numeric");
    }

    let date_cells: Vec<Option<String>> = records
        .iter()
        .map(|r| date_cell(r.get(&date_column)))
        .collect();
    let parsed = parse_date_column(&date_cells);
    match parsed.interpretation {
        DateInterpretation::Strict(format) => info!(%format, "converted dates"),
        DateInterpretation::Permissive => {
            warn!(unparsed = parsed.unparsed, "no single date format matched, used automatic parsing")
        }
    }

    let readings: Vec<Reading> = parsed
        .dates
        .iter()
        .zip(&levels)
        .filter_map(|(date, level)| Some(Reading::new((*date)?, (*level)?)))
        .collect();
    let dropped_rows = records.len() - readings.len();
    if dropped_rows > 0 {
        warn!(count = dropped_rows, "dropped rows with missing data");
    }

    let (series, duplicate_dates) = Series::from_unsorted(readings);
    if duplicate_dates > 0 {
        warn!(count = duplicate_dates, "duplicate dates resolved, last record kept");
    }

    let range = series.date_range();
    if let Some((first, last)) = range {
        info!(total = records.len(), rows = series.len(), %first, %last, "normalized series");
    }

    let report = NormalizeReport {
        total_records: records.len(),
        date_column,
        level_column,
        date_interpretation: parsed.interpretation,
        missing_levels,
        unparsed_dates: parsed.unparsed,
        dropped_rows,
        duplicate_dates,
        first_date: range.map(|(first, _)| first),
        last_date: range.map(|(_, last)| last),
    };

    Ok((series, report))
}

fn schema_mismatch(role: &'static str, available: &[String]) -> IngestError {
    IngestError::SchemaMismatch {
        role,
        available: available.join(", "),
    }
}

/// Text form of a date cell; null, empty, and non-scalar values are missing.
fn date_cell(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric coercion of a level cell. Numbers and numeric strings pass;
/// everything else, including NaN and infinities, is missing.
pub(crate) fn coerce_level(value: Option<&Value>) -> Option<f64> {
    let level = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    level.is_finite().then_some(level)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use crate::ingest::datastore::parse_search_response;
    use dates::DateFormat;

    fn records(json: &str) -> Vec<RawRecord> {
        serde_json::from_str(json).expect("test records should be valid JSON")
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_day_month_year_records_normalize_to_january_2020() {
        let raw = records(
            r#"[
                {"Survey_Date": "02/01/2020", "Kinneret_Level": -211.1},
                {"Survey_Date": "01/01/2020", "Kinneret_Level": -211.3}
            ]"#,
        );
        let (series, report) = normalize_records(&raw, &ColumnCandidates::default())
            .expect("records should normalize");

        assert_eq!(report.date_interpretation, DateInterpretation::Strict(DateFormat::DayMonthYear));
        assert_eq!(series.len(), 2);
        let rows = series.readings();
        assert_eq!(rows[0].date, d(2020, 1, 1));
        assert_eq!(rows[1].date, d(2020, 1, 2));
        assert_eq!(rows[0].water_level, -211.3);
        for row in rows {
            assert_eq!((row.year(), row.month()), (2020, 1));
        }
    }

    #[test]
    fn test_non_numeric_level_is_dropped_and_counted() {
        let raw = records(
            r#"[
                {"Survey_Date": "2020-01-01", "Kinneret_Level": "-211.30"},
                {"Survey_Date": "2020-01-02", "Kinneret_Level": "n/a"},
                {"Survey_Date": "2020-01-03", "Kinneret_Level": -211.2}
            ]"#,
        );
        let (series, report) = normalize_records(&raw, &ColumnCandidates::default()).unwrap();

        assert_eq!(report.missing_levels, 1);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(series.len(), 2);
        assert!(series.readings().iter().all(|r| r.date != d(2020, 1, 2)));
        assert_eq!(series.first().unwrap().water_level, -211.3, "numeric strings coerce");
    }

    #[test]
    fn test_missing_date_column_is_schema_mismatch() {
        let raw = records(r#"[{"_id": 1, "Kinneret_Level": -211.0}]"#);
        let err = normalize_records(&raw, &ColumnCandidates::default()).unwrap_err();
        assert!(
            matches!(err, IngestError::SchemaMismatch { role: "date", .. }),
            "got {:?}",
            err
        );
        assert!(err.to_string().contains("Kinneret_Level"), "error lists available fields");
    }

    #[test]
    fn test_missing_level_column_is_schema_mismatch() {
        let raw = records(r#"[{"_id": 1, "Survey_Date": "2020-01-01", "value": 3}]"#);
        let err = normalize_records(&raw, &ColumnCandidates::default()).unwrap_err();
        assert!(matches!(err, IngestError::SchemaMismatch { role: "water level", .. }));
    }

    #[test]
    fn test_unparseable_dates_are_dropped_not_fatal() {
        let raw = records(
            r#"[
                {"Survey_Date": "2020-01-01", "Kinneret_Level": -211.0},
                {"Survey_Date": "garbage", "Kinneret_Level": -211.1},
                {"Survey_Date": null, "Kinneret_Level": -211.2}
            ]"#,
        );
        let (series, report) = normalize_records(&raw, &ColumnCandidates::default()).unwrap();
        assert_eq!(report.date_interpretation, DateInterpretation::Permissive);
        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.dropped_rows, 2);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_duplicate_dates_are_reported_separately_from_drops() {
        let raw = records(
            r#"[
                {"Survey_Date": "2020-01-01", "Kinneret_Level": -211.0},
                {"Survey_Date": "2020-01-01", "Kinneret_Level": -210.5}
            ]"#,
        );
        let (series, report) = normalize_records(&raw, &ColumnCandidates::default()).unwrap();
        assert_eq!(report.dropped_rows, 0);
        assert_eq!(report.duplicate_dates, 1);
        assert_eq!(series.last().unwrap().water_level, -210.5);
    }

    #[test]
    fn test_datastore_fixture_normalizes_with_iso_datetime() {
        let page = parse_search_response(fixture_full_page_json()).expect("fixture should parse");
        let (series, report) = normalize_records(&page.records, &ColumnCandidates::default())
            .expect("fixture should normalize");

        assert_eq!(report.date_column, "Survey_Date");
        assert_eq!(report.level_column, "Kinneret_Level");
        assert_eq!(report.date_interpretation, DateInterpretation::Strict(DateFormat::IsoDateTime));
        assert_eq!(series.len(), 5);
        assert_eq!(report.first_date, Some(d(2024, 1, 1)));
        assert_eq!(report.last_date, Some(d(2024, 1, 5)));
    }

    #[test]
    fn test_hebrew_fixture_is_recognized() {
        let page = parse_search_response(fixture_hebrew_fields_json()).unwrap();
        let (series, report) =
            normalize_records(&page.records, &ColumnCandidates::default()).unwrap();
        assert_eq!(report.date_column, "תאריך מדידה");
        assert_eq!(report.level_column, "מפלס");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_report_notices_mention_drops() {
        let raw = records(
            r#"[
                {"Survey_Date": "2020-01-01", "Kinneret_Level": -211.0},
                {"Survey_Date": "2020-01-02", "Kinneret_Level": null}
            ]"#,
        );
        let (_, report) = normalize_records(&raw, &ColumnCandidates::default()).unwrap();
        let notices = report.notices();
        assert!(notices.iter().any(|n| n.message.contains("Dropped 1 rows")));
        assert!(notices.iter().any(|n| n.message.contains("Date range: 2020-01-01 to 2020-01-01")));
    }

    #[test]
    fn test_coerce_level_rejects_non_finite_and_booleans() {
        assert_eq!(coerce_level(Some(&Value::String("NaN".into()))), None);
        assert_eq!(coerce_level(Some(&Value::String("inf".into()))), None);
        assert_eq!(coerce_level(Some(&Value::Bool(true))), None);
        assert_eq!(coerce_level(None), None);
        assert_eq!(coerce_level(Some(&serde_json::json!(" -209.87 "))), Some(-209.87));
    }
}
