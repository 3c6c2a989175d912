/// Headline metrics: current level and its day/month/year deltas.
///
/// "A month ago" and "a year ago" are calendar offsets from the latest
/// survey date. When the anchor day does not exist in the target month the
/// offset clamps to that month's last day (Mar 31 − 1 month = Feb 28 or 29,
/// Feb 29 − 1 year = Feb 28). The comparison reading is the last one on or
/// before that date, since surveys are not guaranteed daily.

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::model::Series;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Date of the most recent reading; `None` for an empty series.
    pub latest_date: Option<NaiveDate>,
    /// Most recent level; `None` for an empty series.
    pub current_level: Option<f64>,
    pub daily_change: f64,
    pub monthly_change: f64,
    pub yearly_change: f64,
}

/// Computes all metrics for `series`. An empty series yields
/// `Metrics::default()`.
pub fn compute_metrics(series: &Series) -> Metrics {
    let Some(latest) = series.last() else {
        return Metrics::default();
    };
    let current = latest.water_level;

    Metrics {
        latest_date: Some(latest.date),
        current_level: Some(current),
        daily_change: daily_change(series),
        monthly_change: change_since(series, Months::new(1)).unwrap_or(0.0),
        yearly_change: change_since(series, Months::new(12)).unwrap_or(0.0),
    }
}

/// Last reading minus the one before it; zero with fewer than two rows.
pub fn daily_change(series: &Series) -> f64 {
    match series.readings() {
        [.., previous, last] => last.water_level - previous.water_level,
        _ => 0.0,
    }
}

/// Latest level minus the level of the last reading on or before
/// `latest_date - offset`. `None` when no reading is that old.
pub fn change_since(series: &Series, offset: Months) -> Option<f64> {
    let latest = series.last()?;
    let anchor = latest.date.checked_sub_months(offset)?;
    let readings = series.readings();
    let idx = readings.partition_point(|r| r.date <= anchor);
    let past = readings.get(idx.checked_sub(1)?)?;
    Some(latest.water_level - past.water_level)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
