/// Heuristic column discovery.
///
/// The datastore API does not promise stable field names, so each
/// semantic role (survey date, lake level) is described by an ordered set
/// of lowercase terms. A field qualifies when its lowercased name contains
/// any of the terms; the first qualifying field in API order wins.

use crate::model::RawRecord;

/// Terms identifying the survey-date column. The last one is Hebrew for "date".
pub const DATE_TERMS: &[&str] = &["date", "survey", "תאריך"];

/// Terms identifying the lake-level column: "level", the lake's name, and
/// the Hebrew words for "level" and "Kinneret".
pub const LEVEL_TERMS: &[&str] = &["level", "kinneret", "מפלס", "כנרת"];

/// Candidate terms for both roles the normalizer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCandidates {
    pub date_terms: Vec<String>,
    pub level_terms: Vec<String>,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        Self {
            date_terms: DATE_TERMS.iter().map(|t| t.to_string()).collect(),
            level_terms: LEVEL_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ColumnCandidates {
    /// Appends extra terms after the built-in ones, so built-ins keep priority.
    pub fn extended(mut self, extra_date: &[String], extra_level: &[String]) -> Self {
        self.date_terms.extend(extra_date.iter().map(|t| t.to_lowercase()));
        self.level_terms.extend(extra_level.iter().map(|t| t.to_lowercase()));
        self
    }
}

/// Returns the first name in `available` whose lowercase form contains any
/// of `candidates`.
pub fn match_column<'a, S: AsRef<str>>(candidates: &[S], available: &'a [String]) -> Option<&'a str> {
    available
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            candidates.iter().any(|term| lower.contains(&term.as_ref().to_lowercase()))
        })
        .map(|name| name.as_str())
}

/// Union of field names across all records, in first-seen order.
pub fn field_names(records: &[RawRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
