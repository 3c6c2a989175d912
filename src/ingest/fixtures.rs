/// Test fixtures: representative payloads from the data.gov.il datastore API.
///
/// These fixtures are structurally complete but truncated to the minimum
/// needed to exercise the parser and normalizer. They reflect the CKAN
/// envelope returned by:
///   https://data.gov.il/api/3/action/datastore_search?resource_id=...
///
/// Response shape:
///   response.success                 — false on any API-side failure
///   response.error                   — present when success is false
///   response.result.total            — record count for the whole resource
///   response.result.records[]
///     ._id            — CKAN row id (integer)
///     .Survey_Date    — ISO 8601 without offset, e.g. "2024-01-05T00:00:00"
///     .Kinneret_Level — meters, usually a JSON number, occasionally a string
///
/// Field names are not guaranteed; the Hebrew fixture covers the variant
/// where the resource was published with Hebrew headers.

#[cfg(test)]
use crate::model::RawRecord;

/// `limit=1` probe: one record, total of five.
#[cfg(test)]
pub(crate) fn fixture_count_probe_json() -> &'static str {
    r#"{
      "help": "https://data.gov.il/api/3/action/help_show?name=datastore_search",
      "success": true,
      "result": {
        "include_total": true,
        "limit": 1,
        "records_format": "objects",
        "resource_id": "2de7b543-e13d-4e7e-b4c8-56071bc4d3c8",
        "total_estimation_threshold": null,
        "records": [
          { "_id": 1, "Survey_Date": "2024-01-01T00:00:00", "Kinneret_Level": -212.65 }
        ],
        "fields": [
          { "id": "_id", "type": "int" },
          { "id": "Survey_Date", "type": "timestamp" },
          { "id": "Kinneret_Level", "type": "numeric" }
        ],
        "_links": { "start": "/api/3/action/datastore_search?limit=1", "next": "/api/3/action/datastore_search?offset=1" },
        "total": 5,
        "total_was_estimated": false
      }
    }"#
}

/// All five records of the resource, newest first as the API tends to
/// return them. One level arrives as a string.
#[cfg(test)]
pub(crate) fn fixture_full_page_json() -> &'static str {
    r#"{
      "success": true,
      "result": {
        "resource_id": "2de7b543-e13d-4e7e-b4c8-56071bc4d3c8",
        "records": [
          { "_id": 5, "Survey_Date": "2024-01-05T00:00:00", "Kinneret_Level": -212.58 },
          { "_id": 4, "Survey_Date": "2024-01-04T00:00:00", "Kinneret_Level": "-212.60" },
          { "_id": 3, "Survey_Date": "2024-01-03T00:00:00", "Kinneret_Level": -212.61 },
          { "_id": 2, "Survey_Date": "2024-01-02T00:00:00", "Kinneret_Level": -212.63 },
          { "_id": 1, "Survey_Date": "2024-01-01T00:00:00", "Kinneret_Level": -212.65 }
        ],
        "total": 5
      }
    }"#
}

/// Same data published with Hebrew field names ("survey date", "level").
#[cfg(test)]
pub(crate) fn fixture_hebrew_fields_json() -> &'static str {
    r#"{
      "success": true,
      "result": {
        "records": [
          { "_id": 1, "תאריך מדידה": "01/03/2023", "מפלס": -210.12 },
          { "_id": 2, "תאריך מדידה": "02/03/2023", "מפלס": -210.10 },
          { "_id": 3, "תאריך מדידה": "03/03/2023", "מפלס": -210.07 }
        ],
        "total": 3
      }
    }"#
}

/// Unknown resource id. CKAN answers with `success: false` and an error object.
#[cfg(test)]
pub(crate) fn fixture_not_found_json() -> &'static str {
    r#"{
      "help": "https://data.gov.il/api/3/action/help_show?name=datastore_search",
      "success": false,
      "error": { "message": "Not found: Resource was not found.", "__type": "Not Found Error" }
    }"#
}

/// `n` consecutive daily records starting 2020-01-01, in API shape.
#[cfg(test)]
pub(crate) fn numbered_records(n: usize) -> Vec<RawRecord> {
    let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid start date");
    (0..n)
        .map(|i| {
            let date = start + chrono::Duration::days(i as i64);
            let value = serde_json::json!({
                "_id": i + 1,
                "Survey_Date": format!("{}T00:00:00", date),
                "Kinneret_Level": -211.0 + i as f64 * 0.01,
            });
            match value {
                serde_json::Value::Object(map) => map,
                _ => unreachable!("json! object literal"),
            }
        })
        .collect()
}

/// In-memory datastore serving `records` with CKAN limit/offset slicing.
/// Counts requests so callers can check whether a load hit the source.
#[cfg(test)]
pub(crate) struct VecSource {
    pub records: Vec<RawRecord>,
    pub requests: std::cell::Cell<usize>,
}

#[cfg(test)]
impl VecSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            requests: std::cell::Cell::new(0),
        }
    }
}

#[cfg(test)]
impl crate::ingest::datastore::DatastoreSource for VecSource {
    fn fetch_page(
        &self,
        _resource_id: &str,
        limit: usize,
        offset: Option<usize>,
    ) -> Result<crate::ingest::datastore::DatastorePage, crate::model::IngestError> {
        self.requests.set(self.requests.get() + 1);
        let start = offset.unwrap_or(0).min(self.records.len());
        let end = (start + limit).min(self.records.len());
        Ok(crate::ingest::datastore::DatastorePage {
            total: self.records.len(),
            records: self.records[start..end].to_vec(),
        })
    }
}
