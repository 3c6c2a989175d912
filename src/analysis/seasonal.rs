/// Chart datasets: trend window, year-over-year traces, seasonal averages,
/// and the year × month heatmap.
///
/// Everything here is a pure function of a `Series` snapshot. Months are
/// 1-based throughout, matching `Reading::month`.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::{Reading, Series};

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Abbreviated month name for a 1-based month; `"?"` out of range.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

// ---------------------------------------------------------------------------
// Trend window
// ---------------------------------------------------------------------------

/// Readings within `start..=end`. Reversed bounds give an empty slice.
pub fn filter_date_range(series: &Series, start: NaiveDate, end: NaiveDate) -> &[Reading] {
    series.between(start, end)
}

// ---------------------------------------------------------------------------
// Year-over-year comparison
// ---------------------------------------------------------------------------

/// One point of a year trace, x = day of year (1..=366).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayPoint {
    pub day_of_year: u32,
    pub water_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTrace {
    pub year: i32,
    pub points: Vec<DayPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearComparison {
    pub traces: Vec<YearTrace>,
    /// Requested years that had no readings.
    pub missing_years: Vec<i32>,
}

/// Distinct years present in the series, ascending.
pub fn available_years(series: &Series) -> Vec<i32> {
    let mut years: Vec<i32> = series.readings().iter().map(|r| r.year()).collect();
    years.dedup();
    years
}

/// The `n` most recent distinct years, ascending.
pub fn default_comparison_years(series: &Series, n: usize) -> Vec<i32> {
    let years = available_years(series);
    let skip = years.len().saturating_sub(n);
    years[skip..].to_vec()
}

/// Builds one day-of-year trace per requested year, in request order.
pub fn year_comparison(series: &Series, years: &[i32]) -> YearComparison {
    let mut traces = Vec::new();
    let mut missing_years = Vec::new();

    for &year in years {
        let points: Vec<DayPoint> = series
            .readings()
            .iter()
            .filter(|r| r.year() == year)
            .map(|r| DayPoint {
                day_of_year: r.date.ordinal(),
                water_level: r.water_level,
            })
            .collect();
        if points.is_empty() {
            tracing::warn!(year, "no data available for requested year");
            missing_years.push(year);
        } else {
            traces.push(YearTrace { year, points });
        }
    }

    YearComparison { traces, missing_years }
}

// ---------------------------------------------------------------------------
// Seasonal averages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAverage {
    pub month: u32,
    pub month_name: &'static str,
    pub mean_level: f64,
    pub samples: usize,
}

/// Mean level per calendar month across all years. Months without data
/// are omitted.
pub fn monthly_averages(series: &Series) -> Vec<MonthlyAverage> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for r in series.readings() {
        let entry = sums.entry(r.month()).or_insert((0.0, 0));
        entry.0 += r.water_level;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(month, (sum, n))| MonthlyAverage {
            month,
            month_name: month_name(month),
            mean_level: sum / n as f64,
            samples: n,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Mean level per (year, month). `cells[i][m - 1]` belongs to `years[i]`
/// and month `m`; `None` where that month has no readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub years: Vec<i32>,
    pub month_names: Vec<&'static str>,
    pub cells: Vec<[Option<f64>; 12]>,
}

pub fn heatmap(series: &Series) -> Heatmap {
    let mut sums: BTreeMap<i32, [(f64, usize); 12]> = BTreeMap::new();
    for r in series.readings() {
        let row = sums.entry(r.year()).or_insert([(0.0, 0); 12]);
        let cell = &mut row[r.date.month0() as usize];
        cell.0 += r.water_level;
        cell.1 += 1;
    }

    let years: Vec<i32> = sums.keys().copied().collect();
    let cells = sums
        .into_values()
        .map(|row| row.map(|(sum, n)| (n > 0).then(|| sum / n as f64)))
        .collect();

    Heatmap {
        years,
        month_names: MONTH_NAMES.to_vec(),
        cells,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
