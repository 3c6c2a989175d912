/// Data quality summary for a loaded series.
///
/// Flags the things worth eyeballing before trusting a chart: implausible
/// readings, years with thin coverage, and long stretches with no survey.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Reading, Series};

/// Readings further than this many standard deviations from the mean are outliers.
pub const OUTLIER_SIGMAS: f64 = 3.0;
/// Years with fewer readings than this are reported as sparse.
pub const SPARSE_YEAR_MIN_RECORDS: usize = 10;
/// Consecutive readings further apart than this many days form a gap.
pub const GAP_THRESHOLD_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub records: usize,
    pub min_level: Option<f64>,
    pub max_level: Option<f64>,
    pub mean_level: Option<f64>,
    pub std_dev: Option<f64>,
    pub outliers: Vec<Reading>,
    pub records_per_year: BTreeMap<i32, usize>,
    pub sparse_years: Vec<i32>,
    pub gaps: Vec<Gap>,
}

pub fn assess(series: &Series) -> QualityReport {
    let readings = series.readings();
    let levels: Vec<f64> = readings.iter().map(|r| r.water_level).collect();

    let mean = mean(&levels);
    // Sample standard deviation; undefined below two readings.
    let std_dev = mean.filter(|_| levels.len() > 1).map(|m| {
        let var = levels.iter().map(|l| (l - m).powi(2)).sum::<f64>() / (levels.len() - 1) as f64;
        var.sqrt()
    });

    let outliers = match (mean, std_dev) {
        (Some(m), Some(sd)) if sd > 0.0 => readings
            .iter()
            .filter(|r| (r.water_level - m).abs() > OUTLIER_SIGMAS * sd)
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    let mut records_per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for r in readings {
        *records_per_year.entry(r.year()).or_default() += 1;
    }
    let sparse_years = records_per_year
        .iter()
        .filter(|(_, n)| **n < SPARSE_YEAR_MIN_RECORDS)
        .map(|(year, _)| *year)
        .collect();

    let gaps = readings
        .windows(2)
        .filter_map(|pair| {
            let days = (pair[1].date - pair[0].date).num_days();
            (days > GAP_THRESHOLD_DAYS).then(|| Gap {
                from: pair[0].date,
                to: pair[1].date,
                days,
            })
        })
        .collect();

    QualityReport {
        records: readings.len(),
        min_level: levels.iter().copied().reduce(f64::min),
        max_level: levels.iter().copied().reduce(f64::max),
        mean_level: mean,
        std_dev,
        outliers,
        records_per_year,
        sparse_years,
        gaps,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_empty_series() {
        let report = assess(&Series::empty());
        assert_eq!(report.records, 0);
        assert_eq!(report.mean_level, None);
        assert_eq!(report.std_dev, None);
        assert!(report.outliers.is_empty());
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_range_and_mean() {
        let s = Series::from_unsorted(vec![
            Reading::new(d(2020, 1, 1), -212.0),
            Reading::new(d(2020, 1, 2), -210.0),
        ])
        .0;
        let report = assess(&s);
        assert_eq!(report.min_level, Some(-212.0));
        assert_eq!(report.max_level, Some(-210.0));
        assert_eq!(report.mean_level, Some(-211.0));
        assert!((report.std_dev.unwrap() - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_outlier_detection() {
        let start = d(2020, 1, 1);
        let mut rows: Vec<Reading> = (0..30)
            .map(|i| Reading::new(start + Duration::days(i), -211.0 + (i % 3) as f64 * 0.01))
            .collect();
        rows.push(Reading::new(d(2020, 3, 1), -150.0)); // transcription error
        let report = assess(&Series::from_unsorted(rows).0);

        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].water_level, -150.0);
    }

    #[test]
    fn test_sparse_years_and_gaps() {
        let start = d(2020, 1, 1);
        let mut rows: Vec<Reading> = (0..12)
            .map(|i| Reading::new(start + Duration::days(i), -211.0))
            .collect();
        rows.push(Reading::new(d(2021, 6, 1), -210.0));
        let report = assess(&Series::from_unsorted(rows).0);

        assert_eq!(report.records_per_year.get(&2020), Some(&12));
        assert_eq!(report.sparse_years, vec![2021]);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].from, d(2020, 1, 12));
        assert_eq!(report.gaps[0].to, d(2021, 6, 1));
    }
}
