/// data.gov.il CKAN `datastore_search` API client.
///
/// Handles URL construction, response-envelope parsing, and the
/// count-then-fetch pagination policy for the Kinneret water-level
/// resource:
///   https://data.gov.il/api/3/action/datastore_search
///
/// The response envelope is `{ "success": bool, "result": { "total": n,
/// "records": [...] } }`. Record contents are not interpreted here; see
/// `normalize` for that. See `fixtures.rs` for annotated examples.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::model::{IngestError, RawRecord};

// ---------------------------------------------------------------------------
// Serde structures for the CKAN envelope
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    result: Option<SearchResult>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    records: Vec<RawRecord>,
}

/// One page of a `datastore_search` response.
#[derive(Debug, Clone, PartialEq)]
pub struct DatastorePage {
    /// Total records in the resource, independent of `limit`/`offset`.
    pub total: usize,
    pub records: Vec<RawRecord>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://data.gov.il/api/3/action/datastore_search";

/// Resource id of the Kinneret daily water-level dataset.
pub const KINNERET_RESOURCE_ID: &str = "2de7b543-e13d-4e7e-b4c8-56071bc4d3c8";

/// Builds a `datastore_search` URL. `offset` is omitted when `None`.
///
/// # Example
/// ```
/// use kinneret_monitor::ingest::datastore::{build_search_url, DEFAULT_BASE_URL, KINNERET_RESOURCE_ID};
///
/// let url = build_search_url(DEFAULT_BASE_URL, KINNERET_RESOURCE_ID, 1, None);
/// assert!(url.ends_with("&limit=1"));
/// ```
pub fn build_search_url(base_url: &str, resource_id: &str, limit: usize, offset: Option<usize>) -> String {
    let mut url = format!(
        "{}?resource_id={}&limit={}",
        base_url,
        urlencoding::encode(resource_id),
        limit
    );
    if let Some(offset) = offset {
        url.push_str(&format!("&offset={}", offset));
    }
    url
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a `datastore_search` JSON body.
///
/// # Errors
/// - `IngestError::MalformedResponse` — not JSON, or the envelope is missing
///   `result.total` on a successful response.
/// - `IngestError::ApiUnavailable` — `success` is absent or false. The API's
///   `error` object, if any, is included in the message.
pub fn parse_search_response(json: &str) -> Result<DatastorePage, IngestError> {
    let response: SearchResponse = serde_json::from_str(json)
        .map_err(|e| IngestError::MalformedResponse(format!("JSON deserialization failed: {}", e)))?;

    if !response.success {
        let detail = response
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(IngestError::ApiUnavailable(format!("API request failed: {}", detail)));
    }

    let result = response
        .result
        .ok_or_else(|| IngestError::MalformedResponse("Missing result object".to_string()))?;
    let total = result
        .total
        .ok_or_else(|| IngestError::MalformedResponse("Missing result.total".to_string()))?;

    let total = usize::try_from(total)
        .map_err(|_| IngestError::MalformedResponse(format!("result.total {} out of range", total)))?;

    Ok(DatastorePage {
        total,
        records: result.records,
    })
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Something that can answer a single `datastore_search` request.
pub trait DatastoreSource {
    fn fetch_page(
        &self,
        resource_id: &str,
        limit: usize,
        offset: Option<usize>,
    ) -> Result<DatastorePage, IngestError>;
}

/// Blocking reqwest implementation against a real CKAN endpoint.
pub struct HttpDatastore {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpDatastore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::blocking::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl DatastoreSource for HttpDatastore {
    fn fetch_page(
        &self,
        resource_id: &str,
        limit: usize,
        offset: Option<usize>,
    ) -> Result<DatastorePage, IngestError> {
        let url = build_search_url(&self.base_url, resource_id, limit, offset);
        debug!(%url, "requesting datastore page");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(IngestError::ApiUnavailable(format!("HTTP error: {}", response.status())));
        }

        let body = response.text()?;
        parse_search_response(&body)
    }
}

// ---------------------------------------------------------------------------
// Full fetch
// ---------------------------------------------------------------------------

/// Page-size policy for [`fetch_all_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Largest `limit` the API is assumed to honour in a single request.
    pub single_page_limit: usize,
    /// Page size when the resource exceeds `single_page_limit`.
    pub batch_size: usize,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            single_page_limit: 32_000,
            batch_size: 10_000,
        }
    }
}

/// Records retrieved by a full fetch plus the count the API promised.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecords {
    pub records: Vec<RawRecord>,
    pub expected_total: usize,
}

impl FetchedRecords {
    /// True when fewer than 90% of the promised records arrived.
    pub fn is_partial(&self) -> bool {
        (self.records.len() as u128) * 10 < (self.expected_total as u128) * 9
    }
}

/// Fetches every record of `resource_id`.
///
/// A `limit=1` probe learns the total. Resources within
/// `plan.single_page_limit` are fetched in one request; larger ones are
/// paged with `plan.batch_size`, advancing the offset by the number of
/// records each page actually returned and stopping at the first empty
/// page. A short result is logged but still returned.
///
/// # Errors
/// - `IngestError::ApiUnavailable` / `Http` / `MalformedResponse` — any
///   request failed.
/// - `IngestError::EmptyDataset` — the API reports zero records.
pub fn fetch_all_records<S: DatastoreSource + ?Sized>(
    source: &S,
    resource_id: &str,
    plan: &FetchPlan,
) -> Result<FetchedRecords, IngestError> {
    let probe = source.fetch_page(resource_id, 1, None)?;
    let total = probe.total;
    info!(total, "datastore reports record count");

    if total == 0 {
        return Err(IngestError::EmptyDataset);
    }

    let records = if total <= plan.single_page_limit {
        source.fetch_page(resource_id, total, None)?.records
    } else {
        let batch_size = plan.batch_size.max(1);
        let mut records: Vec<RawRecord> = Vec::with_capacity(total.min(batch_size));
        let mut offset = 0;
        while records.len() < total {
            let page = source.fetch_page(resource_id, batch_size, Some(offset))?;
            if page.records.is_empty() {
                warn!(offset, "datastore returned an empty page, stopping pagination");
                break;
            }
            offset += page.records.len();
            records.extend(page.records);
            debug!(retrieved = records.len(), total, "retrieved datastore page");
        }
        records
    };

    let fetched = FetchedRecords {
        records,
        expected_total: total,
    };
    if fetched.is_partial() {
        warn!(
            retrieved = fetched.records.len(),
            expected = total,
            "retrieved fewer than 90% of the expected records"
        );
    } else {
        info!(retrieved = fetched.records.len(), "retrieved datastore records");
    }

    Ok(fetched)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
