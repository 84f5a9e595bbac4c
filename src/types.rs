//! Wire and cache types for substitution-plan data.
//!
//! Field names on the wire are the German column labels used by the
//! upstream table and the browser client (`kurs`, `stunde`, ...); the
//! Rust names are English. The same shape serves as the cache record on
//! disk and as the HTTP response body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single substitution record for one course and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Course identifier. Required; rows without one are discarded at parse time.
    #[serde(rename = "kurs")]
    pub course: String,
    /// Period of the day, e.g. `3` or `5-6`.
    #[serde(rename = "stunde")]
    pub period: String,
    /// Room, or `-` when unchanged/unknown.
    #[serde(rename = "raum")]
    pub room: String,
    /// Substitute teacher, or `-`.
    #[serde(rename = "lehrer")]
    pub teacher: String,
    /// Kind of substitution (Entfall, Vertretung, ...).
    #[serde(rename = "typ")]
    pub kind: String,
    /// Free-text note, or `-`.
    #[serde(rename = "notizen")]
    pub note: String,
    /// Source date (`YYYY-MM-DD`). Only present on entries inside a
    /// merged multi-date result.
    #[serde(rename = "datum", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ScheduleEntry {
    /// Returns a copy of this entry tagged with its source date.
    pub fn tagged(mut self, datum: &str) -> Self {
        self.date = Some(datum.to_owned());
        self
    }
}

/// The cached unit for one calendar date: all entries plus the derived
/// course list. Also the response body shape for single-date queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
    /// Substitution entries for the date, in table order.
    #[serde(rename = "data")]
    pub entries: Vec<ScheduleEntry>,
    /// Sorted, deduplicated, non-empty course identifiers across `entries`.
    #[serde(default)]
    pub courses: Vec<String>,
}

impl DaySnapshot {
    /// Builds a snapshot from entries, deriving the course list.
    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        let courses = derive_courses(&entries);
        Self { entries, courses }
    }

    /// A snapshot with no entries, the "data unavailable" value.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            courses: Vec::new(),
        }
    }

    /// Re-derives the course list from the current entries. Used after
    /// reading records whose stored course list may predate the entries.
    pub fn with_rederived_courses(mut self) -> Self {
        self.courses = derive_courses(&self.entries);
        self
    }
}

/// Sorted, deduplicated set of non-empty course values.
fn derive_courses(entries: &[ScheduleEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.course.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
