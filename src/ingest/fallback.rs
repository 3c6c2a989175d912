/// Local CSV fallback for when the datastore API is unreachable.
///
/// The canonical file layout is the one `write_series_csv` produces:
///
/// ```text
/// date,water_level,year,month
/// 2024-01-01,-212.65,2024,1
/// ```
///
/// Older exports use `Survey_Date` (day/month/year) and `Kinneret_Level`
/// headers instead. Those are mapped across by the same candidate terms the
/// normalizer uses; a headerless two-column file is read positionally.
/// `year` and `month` are always re-derived from the date.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::{info, warn};

use crate::model::{IngestError, Reading, Series};
use crate::normalize::columns::{match_column, ColumnCandidates};
use crate::normalize::dates::{parse_date_column, DateInterpretation};

pub const CANONICAL_HEADERS: [&str; 4] = ["date", "water_level", "year", "month"];

/// Counts from reading a fallback file.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackReport {
    pub rows_read: usize,
    pub dropped_rows: usize,
    pub duplicate_dates: usize,
    pub date_interpretation: DateInterpretation,
}

/// Reads the fallback file at `path`.
///
/// # Errors
/// - `IngestError::Io` — the file cannot be opened.
/// - `IngestError::Csv` — the file is not readable as CSV.
/// - `IngestError::LocalFallbackFailure` — no usable date or level column.
pub fn read_fallback_csv(
    path: &Path,
    candidates: &ColumnCandidates,
) -> Result<(Series, FallbackReport), IngestError> {
    let file = File::open(path)?;
    let (series, report) = read_series_csv(file, candidates)?;
    info!(path = %path.display(), rows = series.len(), "loaded local fallback file");
    Ok((series, report))
}

/// Reads a series from any CSV source with a header row.
pub fn read_series_csv<R: Read>(
    reader: R,
    candidates: &ColumnCandidates,
) -> Result<(Series, FallbackReport), IngestError> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
    let (date_idx, level_idx) = locate_columns(&headers, candidates)?;

    let mut date_cells: Vec<Option<String>> = Vec::new();
    let mut levels: Vec<Option<f64>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        date_cells.push(record.get(date_idx).filter(|s| !s.is_empty()).map(String::from));
        levels.push(
            record
                .get(level_idx)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|l| l.is_finite()),
        );
    }

    let parsed = parse_date_column(&date_cells);
    let readings: Vec<Reading> = parsed
        .dates
        .iter()
        .zip(&levels)
        .filter_map(|(date, level)| Some(Reading::new((*date)?, (*level)?)))
        .collect();

    let rows_read = date_cells.len();
    let dropped_rows = rows_read - readings.len();
    if dropped_rows > 0 {
        warn!(count = dropped_rows, "dropped fallback rows with missing data");
    }
    let (series, duplicate_dates) = Series::from_unsorted(readings);

    Ok((
        series,
        FallbackReport {
            rows_read,
            dropped_rows,
            duplicate_dates,
            date_interpretation: parsed.interpretation,
        },
    ))
}

/// Picks the date and level column indices: canonical names first, then
/// the candidate terms, then position for a bare two-column file.
fn locate_columns(headers: &[String], candidates: &ColumnCandidates) -> Result<(usize, usize), IngestError> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    let date = position("date")
        .or_else(|| match_column(&candidates.date_terms, headers).and_then(position));
    let level = position("water_level")
        .or_else(|| match_column(&candidates.level_terms, headers).and_then(position));

    match (date, level) {
        (Some(d), Some(l)) if d != l => Ok((d, l)),
        _ if headers.len() == 2 => {
            warn!(?headers, "fallback headers not recognized, reading columns by position");
            Ok((0, 1))
        }
        _ => Err(IngestError::LocalFallbackFailure(format!(
            "no date/water level columns among [{}]",
            headers.join(", ")
        ))),
    }
}

/// Writes `series` in the canonical layout. An empty series produces a
/// header-only file.
pub fn write_series_csv(path: &Path, series: &Series) -> Result<(), IngestError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(CANONICAL_HEADERS)?;
    for r in series.readings() {
        writer.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.water_level.to_string(),
            r.year().to_string(),
            r.month().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
