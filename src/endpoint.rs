/// HTTP endpoint serving the dashboard data contract
///
/// The presentation layer reads everything it draws from here. Each data
/// route works on the cached `LoadOutcome`, which is reloaded when older
/// than the configured TTL.
///
/// Endpoints:
/// - GET /health   - Service health check
/// - GET /series   - Trend rows, optional `start`/`end` (YYYY-MM-DD), axis range
/// - GET /metrics  - Current level, deltas, level status, load notices
/// - GET /years    - Year-over-year traces, optional `years=2019,2020`
/// - GET /seasonal - Monthly averages and the year x month heatmap
/// - GET /quality  - Data quality summary

use std::collections::HashMap;
use std::io::Cursor;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::analysis::{metrics, quality, seasonal};
use crate::cache::TimedCache;
use crate::ingest::datastore::DatastoreSource;
use crate::loader::WaterLevelLoader;
use crate::model::LoadOutcome;
use crate::thresholds;

/// Years shown by `/years` when the request names none.
pub const DEFAULT_COMPARISON_YEARS: usize = 5;

const ENDPOINTS: [&str; 6] = ["/health", "/series", "/metrics", "/years", "/seasonal", "/quality"];

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything a request needs: the loader and the cache of its last result.
pub struct DashboardState<S> {
    loader: WaterLevelLoader<S>,
    cache: TimedCache<LoadOutcome>,
}

impl<S: DatastoreSource> DashboardState<S> {
    pub fn new(loader: WaterLevelLoader<S>, cache: TimedCache<LoadOutcome>) -> Self {
        Self { loader, cache }
    }

    /// The current load outcome, reloading it if the cache has expired.
    pub fn outcome(&mut self, now: DateTime<Utc>) -> &LoadOutcome {
        let loader = &self.loader;
        self.cache.get_or_refresh(now, || loader.load())
    }

    /// Answers one request URL (path plus optional query string).
    pub fn route(&mut self, url: &str, now: DateTime<Utc>) -> (u16, Value) {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (url, HashMap::new()),
        };

        let result = match path.trim_end_matches('/') {
            "/health" => Ok(handle_health()),
            "/series" => self.handle_series(&query, now),
            "/metrics" => Ok(self.handle_metrics(now)),
            "/years" => self.handle_years(&query, now),
            "/seasonal" => Ok(self.handle_seasonal(now)),
            "/quality" => Ok(to_json(&quality::assess(&self.outcome(now).series))),
            _ => Err(not_found()),
        };
        match result {
            Ok(body) => (200, body),
            Err(failure) => failure,
        }
    }

    fn handle_series(
        &mut self,
        query: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Value, (u16, Value)> {
        let start = query_date(query, "start")?;
        let end = query_date(query, "end")?;

        let outcome = self.outcome(now);
        let series = &outcome.series;
        let Some((first, last)) = series.date_range() else {
            return Ok(json!({
                "origin": outcome.origin,
                "count": 0,
                "readings": [],
                "axis_range": axis_json(thresholds::trend_axis_range(series)),
                "red_lines": red_lines_json(),
            }));
        };

        let start = start.unwrap_or(first);
        let end = end.unwrap_or(last);
        let window = seasonal::filter_date_range(series, start, end);
        Ok(json!({
            "origin": outcome.origin,
            "start": start,
            "end": end,
            "count": window.len(),
            "readings": window,
            "axis_range": axis_json(thresholds::trend_axis_range(series)),
            "red_lines": red_lines_json(),
        }))
    }

    fn handle_metrics(&mut self, now: DateTime<Utc>) -> Value {
        let outcome = self.outcome(now);
        let computed = metrics::compute_metrics(&outcome.series);
        json!({
            "metrics": computed,
            "level_status": computed.current_level.map(|l| thresholds::classify_level(l).as_str()),
            "origin": outcome.origin,
            "record_count": outcome.series.len(),
            "date_range": outcome.series.date_range(),
            "loaded_at": outcome.loaded_at,
            "notices": outcome.notices,
        })
    }

    fn handle_years(
        &mut self,
        query: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Value, (u16, Value)> {
        let requested = match query.get("years").filter(|v| !v.trim().is_empty()) {
            Some(list) => Some(parse_years(list)?),
            None => None,
        };

        let series = &self.outcome(now).series;
        let years = requested
            .unwrap_or_else(|| seasonal::default_comparison_years(series, DEFAULT_COMPARISON_YEARS));
        Ok(json!({
            "available_years": seasonal::available_years(series),
            "comparison": seasonal::year_comparison(series, &years),
        }))
    }

    fn handle_seasonal(&mut self, now: DateTime<Utc>) -> Value {
        let series = &self.outcome(now).series;
        json!({
            "monthly_averages": seasonal::monthly_averages(series),
            "heatmap": seasonal::heatmap(series),
        })
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Splits `a=1&b=2` into decoded pairs. Later duplicates win.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

fn query_date(query: &HashMap<String, String>, key: &str) -> Result<Option<NaiveDate>, (u16, Value)> {
    match query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| bad_request(format!("'{}' must be a date as YYYY-MM-DD, got '{}'", key, value))),
    }
}

fn parse_years(list: &str) -> Result<Vec<i32>, (u16, Value)> {
    list.split(',')
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .map(|y| {
            y.parse::<i32>()
                .map_err(|_| bad_request(format!("'years' must be comma-separated years, got '{}'", y)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn handle_health() -> Value {
    json!({
        "status": "ok",
        "service": "kinneret_monitor",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

fn axis_json((min, max): (f64, f64)) -> Value {
    json!({ "min": min, "max": max })
}

fn red_lines_json() -> Value {
    json!({
        "upper_red_line": thresholds::UPPER_RED_LINE_M,
        "lower_red_line": thresholds::LOWER_RED_LINE_M,
        "black_line": thresholds::BLACK_LINE_M,
    })
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!(error = %e, "failed to serialize response");
        json!({ "error": "serialization failed" })
    })
}

fn not_found() -> (u16, Value) {
    (
        404,
        json!({
            "error": "Not found",
            "available_endpoints": ENDPOINTS,
        }),
    )
}

fn bad_request(message: String) -> (u16, Value) {
    (400, json!({ "error": message }))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Binds `0.0.0.0:port` and serves requests until the process exits.
pub fn start_endpoint_server<S: DatastoreSource>(port: u16, state: DashboardState<S>) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;
    info!(port, endpoints = ?ENDPOINTS, "HTTP endpoint listening");
    serve(server, state);
    Ok(())
}

/// Serves requests from an already bound server, one at a time.
pub fn serve<S: DatastoreSource>(server: tiny_http::Server, mut state: DashboardState<S>) {
    for request in server.incoming_requests() {
        let (status, body) = state.route(request.url(), Utc::now());
        info!(method = %request.method(), url = request.url(), status, "handled request");
        if let Err(e) = request.respond(create_response(status, &body)) {
            warn!(error = %e, "failed to send response");
        }
    }
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: &Value) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(json).unwrap_or_else(|_| "{}".to_string());
    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));
    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
