/// Load orchestration: remote datastore → local fallback file → empty.
///
/// One call to [`WaterLevelLoader::load`] is one load cycle. Fetch and
/// normalize failures are handled together and trigger the fallback file;
/// a failing fallback ends the cycle with an empty series. Nothing here
/// returns an error: every outcome is a `LoadOutcome` whose notices say
/// what happened.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::ingest::datastore::{fetch_all_records, DatastoreSource, FetchPlan, KINNERET_RESOURCE_ID};
use crate::ingest::fallback::{read_fallback_csv, write_series_csv};
use crate::model::{DataOrigin, IngestError, LoadOutcome, Notice, Series};
use crate::normalize::columns::ColumnCandidates;
use crate::normalize::normalize_records;

pub const DEFAULT_FALLBACK_PATH: &str = "water_level.csv";

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub resource_id: String,
    pub plan: FetchPlan,
    pub fallback_path: PathBuf,
    pub candidates: ColumnCandidates,
    /// Rewrite the fallback file after every successful remote load.
    pub refresh_fallback_on_success: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            resource_id: KINNERET_RESOURCE_ID.to_string(),
            plan: FetchPlan::default(),
            fallback_path: PathBuf::from(DEFAULT_FALLBACK_PATH),
            candidates: ColumnCandidates::default(),
            refresh_fallback_on_success: false,
        }
    }
}

pub struct WaterLevelLoader<S> {
    source: S,
    settings: LoaderSettings,
}

impl<S: DatastoreSource> WaterLevelLoader<S> {
    pub fn new(source: S, settings: LoaderSettings) -> Self {
        Self { source, settings }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one full load cycle.
    pub fn load(&self) -> LoadOutcome {
        let mut notices = Vec::new();

        let (series, origin) = match self.load_remote(&mut notices) {
            Ok(series) => {
                if self.settings.refresh_fallback_on_success {
                    self.refresh_fallback(&series, &mut notices);
                }
                (series, DataOrigin::Remote)
            }
            Err(e) => {
                warn!(error = %e, "remote load failed, trying local fallback");
                notices.push(Notice::error(format!("Error loading data from API: {}", e)));
                match self.load_fallback(&mut notices) {
                    Ok(series) => (series, DataOrigin::LocalFallback),
                    Err(e) => {
                        error!(error = %e, "local fallback failed, no data available");
                        notices.push(Notice::error(format!("Error loading local data: {}", e)));
                        (Series::empty(), DataOrigin::Unavailable)
                    }
                }
            }
        };

        info!(rows = series.len(), ?origin, "load cycle finished");
        LoadOutcome {
            series,
            origin,
            notices,
            loaded_at: Utc::now(),
        }
    }

    fn load_remote(&self, notices: &mut Vec<Notice>) -> Result<Series, IngestError> {
        let fetched = fetch_all_records(&self.source, &self.settings.resource_id, &self.settings.plan)?;
        if fetched.is_partial() {
            notices.push(Notice::warning(format!(
                "Retrieved only {} of {} records",
                fetched.records.len(),
                fetched.expected_total
            )));
        }

        let (series, report) = normalize_records(&fetched.records, &self.settings.candidates)?;
        notices.extend(report.notices());
        notices.push(Notice::info(format!(
            "Successfully loaded {} records from the API",
            series.len()
        )));
        Ok(series)
    }

    fn load_fallback(&self, notices: &mut Vec<Notice>) -> Result<Series, IngestError> {
        let path = &self.settings.fallback_path;
        let (series, report) = read_fallback_csv(path, &self.settings.candidates)
            .map_err(|e| IngestError::LocalFallbackFailure(format!("{}: {}", path.display(), e)))?;

        if report.dropped_rows > 0 {
            notices.push(Notice::warning(format!(
                "Dropped {} rows with missing data from the local file",
                report.dropped_rows
            )));
        }
        notices.push(Notice::warning(format!(
            "Using local data file with {} records",
            series.len()
        )));
        Ok(series)
    }

    fn refresh_fallback(&self, series: &Series, notices: &mut Vec<Notice>) {
        let path = &self.settings.fallback_path;
        match write_series_csv(path, series) {
            Ok(()) => info!(path = %path.display(), rows = series.len(), "refreshed local fallback file"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not refresh local fallback file");
                notices.push(Notice::warning(format!("Could not update local data file: {}", e)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
