/// kinneret_monitor: Lake Kinneret (Sea of Galilee) water-level data service.
///
/// # Module structure
///
/// ```text
/// kinneret_monitor
/// ├── model       — shared data types (Reading, Series, LoadOutcome, IngestError, …)
/// ├── config      — monitor.toml loader with per-key defaults
/// ├── logging     — tracing subscriber setup (RUST_LOG)
/// ├── ingest
/// │   ├── datastore — data.gov.il CKAN datastore_search: URLs, parsing, paginated fetch
/// │   ├── fallback  — local CSV cache: read (with legacy headers) and write
/// │   └── fixtures (test only) — representative API response payloads
/// ├── normalize
/// │   ├── columns — candidate-term column discovery
/// │   └── dates   — ordered multi-format date parsing with permissive fallback
/// ├── loader      — remote → fallback → empty load cycle with notices
/// ├── cache       — single-slot time-boxed memo of the last load
/// ├── thresholds  — red/black regulatory lines, level status, chart axis
/// ├── analysis
/// │   ├── metrics  — current level and day/month/year deltas
/// │   ├── seasonal — trend window, year-over-year, monthly averages, heatmap
/// │   └── quality  — outliers, sparse years, survey gaps
/// └── endpoint    — JSON HTTP API for the dashboard
/// ```

/// Public modules
pub mod analysis;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod thresholds;
