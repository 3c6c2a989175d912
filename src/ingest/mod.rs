/// Data ingestion.
///
/// - `datastore` — data.gov.il CKAN API: URL construction, envelope parsing,
///   paginated full fetch.
/// - `fallback`  — local CSV cache: read with column mapping, write in the
///   canonical layout.
/// - `fixtures` (test only) — representative API response payloads.

pub mod datastore;
pub mod fallback;
pub mod fixtures;
