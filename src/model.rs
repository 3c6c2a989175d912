/// Core data types for the Kinneret water-level monitor.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: only types, their invariants, and the error taxonomy
/// of the load pipeline.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One row of the datastore response, exactly as the API returned it.
///
/// Field names and value types are controlled by the remote API. With
/// serde_json's `preserve_order` feature the map keeps the order in which
/// the API listed the fields, which column discovery relies on.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A single daily water-level survey of the lake.
///
/// `water_level` is in meters relative to sea level, so normal values are
/// negative (around -209 to -215). `year` and `month` are derived from
/// `date` by [`Reading::new`] and are read-only, so they always agree with
/// it. All three are serialized for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub date: NaiveDate,
    pub water_level: f64,
    year: i32,
    month: u32,
}

impl Reading {
    pub fn new(date: NaiveDate, water_level: f64) -> Self {
        Self {
            date,
            water_level,
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1 through 12.
    pub fn month(&self) -> u32 {
        self.month
    }
}

/// The validated, sorted sequence of readings used by every consumer.
///
/// Invariant: strictly ascending by date, no duplicate dates, every level
/// finite. The only way to build one from unsorted input is
/// [`Series::from_unsorted`], which enforces all three.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    readings: Vec<Reading>,
}

impl Series {
    /// A series with no rows. Downstream code special-cases emptiness,
    /// never a missing schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sorts readings by date and removes duplicate dates.
    ///
    /// The sort is stable, so among readings sharing a date the one that
    /// appeared last in `readings` is kept. Non-finite levels are discarded.
    /// Returns the series and the number of duplicate rows removed.
    pub fn from_unsorted(mut readings: Vec<Reading>) -> (Self, usize) {
        readings.retain(|r| r.water_level.is_finite());
        readings.sort_by_key(|r| r.date);

        let before = readings.len();
        let mut kept: Vec<Reading> = Vec::with_capacity(before);
        for reading in readings {
            match kept.last_mut() {
                Some(last) if last.date == reading.date => *last = reading,
                _ => kept.push(reading),
            }
        }
        let duplicates = before - kept.len();

        (Self { readings: kept }, duplicates)
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// First and last date, if the series has any rows.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first()?.date, self.last()?.date))
    }

    /// Readings whose date falls within `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> &[Reading] {
        let lo = self.readings.partition_point(|r| r.date < start);
        let hi = self.readings.partition_point(|r| r.date <= end);
        if lo >= hi { &[] } else { &self.readings[lo..hi] }
    }
}

// ---------------------------------------------------------------------------
// Load outcome
// ---------------------------------------------------------------------------

/// Where the series handed to the presentation layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Fetched and normalized from the datastore API.
    Remote,
    /// Remote path failed; read from the local CSV file.
    LocalFallback,
    /// Both paths failed; the series is empty.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A human-readable status message meant for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Result of one full load cycle. Never an error: total failure is an
/// empty series with `origin == Unavailable`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub series: Series,
    pub origin: DataOrigin,
    pub notices: Vec<Notice>,
    pub loaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while fetching, normalizing, or reading the fallback file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The API answered but did not report success.
    #[error("datastore API unavailable: {0}")]
    ApiUnavailable(String),

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON envelope.
    #[error("malformed datastore response: {0}")]
    MalformedResponse(String),

    /// The API reported zero records for the resource.
    #[error("datastore resource contains no records")]
    EmptyDataset,

    /// No column could be identified for a required role.
    #[error("no {role} column among fields [{available}]")]
    SchemaMismatch { role: &'static str, available: String },

    /// A strict date format did not match one of the column's cells.
    #[error("date '{value}' does not match format {format}")]
    DateParseFailure { format: &'static str, value: String },

    /// The local fallback file could not be read.
    #[error("local fallback failed: {0}")]
    LocalFallbackFailure(String),

    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_reading_derives_year_and_month() {
        let r = Reading::new(d(2021, 11, 30), -210.4);
        assert_eq!(r.year(), 2021);
        assert_eq!(r.month(), 11);
    }

    #[test]
    fn test_reading_serializes_calendar_fields() {
        let r = Reading::new(d(2020, 1, 31), -211.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["date"], "2020-01-31");
        assert_eq!(json["year"], 2020);
        assert_eq!(json["month"], 1);
    }

    #[test]
    fn test_from_unsorted_sorts_ascending() {
        let (series, dups) = Series::from_unsorted(vec![
            Reading::new(d(2020, 3, 1), -211.0),
            Reading::new(d(2020, 1, 1), -212.0),
            Reading::new(d(2020, 2, 1), -211.5),
        ]);
        assert_eq!(dups, 0);
        let dates: Vec<_> = series.readings().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1)]);
    }

    #[test]
    fn test_duplicate_dates_keep_last_in_source_order() {
        let (series, dups) = Series::from_unsorted(vec![
            Reading::new(d(2020, 1, 2), -211.0),
            Reading::new(d(2020, 1, 1), -212.0),
            Reading::new(d(2020, 1, 2), -210.9),
        ]);
        assert_eq!(dups, 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().water_level, -210.9);
    }

    #[test]
    fn test_non_finite_levels_are_discarded() {
        let (series, _) = Series::from_unsorted(vec![
            Reading::new(d(2020, 1, 1), f64::NAN),
            Reading::new(d(2020, 1, 2), -211.0),
        ]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_between_is_inclusive() {
        let (series, _) = Series::from_unsorted(
            (1..=5).map(|day| Reading::new(d(2020, 1, day), -211.0)).collect(),
        );
        let slice = series.between(d(2020, 1, 2), d(2020, 1, 4));
        assert_eq!(slice.len(), 3);
        assert!(series.between(d(2020, 1, 4), d(2020, 1, 2)).is_empty());
    }

    #[test]
    fn test_empty_series_has_no_range() {
        assert!(Series::empty().date_range().is_none());
    }
}
