/// Derived data for the dashboard.
///
/// Submodules:
/// - `metrics`  — current level and day/month/year deltas.
/// - `seasonal` — trend window, year-over-year traces, monthly averages,
///   year × month heatmap.
/// - `quality`  — range, outliers, per-year coverage, survey gaps.

pub mod metrics;
pub mod quality;
pub mod seasonal;
