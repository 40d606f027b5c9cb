#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion input, validation report, and record set types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crime_hotspots_crime_models::IncidentRecord;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One row of raw tabular input, before validation.
///
/// Every field is kept as text so that malformed values are counted as
/// rejections rather than failing the whole read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIncidentRow {
    /// Source identifier. Synthesized from the row index when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Timestamp text in any supported format.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(default)]
    pub latitude: Option<String>,
    /// Longitude in decimal degrees.
    #[serde(default)]
    pub longitude: Option<String>,
    /// Category label, e.g. `"THEFT"`.
    #[serde(default)]
    pub category: Option<String>,
    /// Arrest flag (`true`/`false`, `1`/`0`, `yes`/`no`).
    #[serde(default)]
    pub arrest: Option<String>,
}

/// Why a raw row was excluded from the record set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionReason {
    /// No timestamp value.
    MissingTimestamp,
    /// Timestamp present but not in a recognized format.
    InvalidTimestamp,
    /// Latitude or longitude absent.
    MissingCoordinates,
    /// Latitude or longitude not a number.
    InvalidCoordinates,
    /// Latitude outside [-90, 90].
    LatitudeOutOfRange,
    /// Longitude outside [-180, 180].
    LongitudeOutOfRange,
    /// Category absent or blank.
    MissingCategory,
    /// Category would grow the vocabulary past its configured bound.
    CategoryLimitExceeded,
    /// Another accepted row already used this id.
    DuplicateId,
}

/// Counts produced by validation. Rejections are never dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Rows seen.
    pub total_rows: u64,
    /// Rows that became records.
    pub accepted: u64,
    /// Rows rejected, by reason.
    pub rejections: BTreeMap<RejectionReason, u64>,
}

impl IngestReport {
    /// Records one rejected row.
    pub fn reject(&mut self, reason: RejectionReason) {
        self.total_rows += 1;
        *self.rejections.entry(reason).or_insert(0) += 1;
    }

    /// Records one accepted row.
    pub fn accept(&mut self) {
        self.total_rows += 1;
        self.accepted += 1;
    }

    /// Total rejected rows across all reasons.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejections.values().sum()
    }
}

/// A non-empty, validated set of incident records.
///
/// Also carries the analysis anchor: the latest timestamp in the full
/// dataset. Rolling time windows are measured back from this instant, not
/// from the wall clock, so results are reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    records: Vec<IncidentRecord>,
    report: IngestReport,
    anchor: DateTime<Utc>,
}

impl RecordSet {
    /// Builds a record set. Returns `None` when `records` is empty.
    #[must_use]
    pub fn new(records: Vec<IncidentRecord>, report: IngestReport) -> Option<Self> {
        let anchor = records.iter().map(|r| r.occurred_at).max()?;
        Some(Self {
            records,
            report,
            anchor,
        })
    }

    /// Records in input order.
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Validation counts from ingestion.
    #[must_use]
    pub const fn report(&self) -> &IngestReport {
        &self.report
    }

    /// Maximum timestamp in the dataset.
    #[must_use]
    pub const fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn record(id: &str, day: u32) -> IncidentRecord {
        IncidentRecord {
            id: id.to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            latitude: 41.9,
            longitude: -87.6,
            category: "THEFT".to_string(),
            arrest: Some(false),
        }
    }

    #[test]
    fn anchor_is_max_timestamp() {
        let set = RecordSet::new(
            vec![record("a", 3), record("b", 9), record("c", 5)],
            IngestReport::default(),
        )
        .unwrap();
        assert_eq!(
            set.anchor(),
            Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn empty_record_set_is_refused() {
        assert!(RecordSet::new(vec![], IngestReport::default()).is_none());
    }

    #[test]
    fn report_counts_rejections_by_reason() {
        let mut report = IngestReport::default();
        report.accept();
        report.reject(RejectionReason::LatitudeOutOfRange);
        report.reject(RejectionReason::LatitudeOutOfRange);
        report.reject(RejectionReason::MissingTimestamp);

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected(), 3);
        assert_eq!(
            report.rejections.get(&RejectionReason::LatitudeOutOfRange),
            Some(&2)
        );
    }

    #[test]
    fn rejection_reason_serializes_snake_case() {
        assert_eq!(RejectionReason::DuplicateId.to_string(), "duplicate_id");
    }
}
