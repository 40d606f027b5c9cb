#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature preparation: turns raw incident rows into a validated
//! [`RecordSet`].
//!
//! Rows with a missing or unparseable timestamp, out-of-range coordinates,
//! a blank category, or a repeated id are rejected and counted in the
//! [`IngestReport`]. Loading only fails when nothing survives validation.

pub mod csv_input;
pub mod parsing;

use std::collections::BTreeSet;

use crime_hotspots_crime_models::{IncidentRecord, normalize_category};
use crime_hotspots_ingest_models::{IngestReport, RawIncidentRow, RecordSet, RejectionReason};
use thiserror::Error;

pub use csv_input::{read_csv, read_csv_path};

/// Default bound on the number of distinct category labels.
pub const DEFAULT_MAX_CATEGORIES: usize = 512;

/// Errors that can occur while loading incident data.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No rows survived validation.
    #[error("No valid records after validation ({rejected} of {total_rows} rows rejected)")]
    DataIntegrity {
        /// Rows seen.
        total_rows: u64,
        /// Rows rejected.
        rejected: u64,
        /// Full validation counts.
        report: IngestReport,
    },

    /// The CSV input could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input file could not be opened.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options controlling validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Maximum number of distinct category labels accepted. Rows that would
    /// introduce a label past this bound are rejected.
    pub max_categories: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_categories: DEFAULT_MAX_CATEGORIES,
        }
    }
}

/// Validates raw rows with default options.
///
/// # Errors
///
/// Returns [`IngestError::DataIntegrity`] if no valid records remain.
pub fn load(rows: impl IntoIterator<Item = RawIncidentRow>) -> Result<RecordSet, IngestError> {
    load_with_options(rows, IngestOptions::default())
}

/// Validates raw rows into a [`RecordSet`], preserving input order.
///
/// # Errors
///
/// Returns [`IngestError::DataIntegrity`] if no valid records remain.
pub fn load_with_options(
    rows: impl IntoIterator<Item = RawIncidentRow>,
    options: IngestOptions,
) -> Result<RecordSet, IngestError> {
    let mut report = IngestReport::default();
    let mut records = Vec::new();
    let mut seen_ids = BTreeSet::new();
    let mut synthesized = Vec::new();
    let mut categories = BTreeSet::new();

    for (index, row) in rows.into_iter().enumerate() {
        match validate_row(index, row, &seen_ids, &categories, options) {
            Ok((record, explicit_id)) => {
                if explicit_id {
                    seen_ids.insert(record.id.clone());
                } else {
                    synthesized.push(records.len());
                }
                categories.insert(record.category.clone());
                records.push(record);
                report.accept();
            }
            Err(reason) => report.reject(reason),
        }
    }

    assign_synthesized_ids(&mut records, &synthesized, seen_ids);

    if report.rejected() > 0 {
        log::warn!(
            "Rejected {} of {} rows: {}",
            report.rejected(),
            report.total_rows,
            report
                .rejections
                .iter()
                .map(|(reason, count)| format!("{reason}={count}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let total_rows = report.total_rows;
    let rejected = report.rejected();

    let Some(set) = RecordSet::new(records, report.clone()) else {
        return Err(IngestError::DataIntegrity {
            total_rows,
            rejected,
            report,
        });
    };

    log::info!(
        "Loaded {} records ({} categories, anchor {})",
        set.len(),
        categories.len(),
        set.anchor()
    );

    Ok(set)
}

/// Gives every record without a source id a unique `row-<index>` id.
///
/// Source ids win: if `row-<index>` is already taken by a source id, a
/// numeric suffix is appended until the id is free.
fn assign_synthesized_ids(
    records: &mut [IncidentRecord],
    positions: &[usize],
    mut taken: BTreeSet<String>,
) {
    for &position in positions {
        let Some(record) = records.get_mut(position) else {
            continue;
        };
        if taken.contains(&record.id) {
            let base = std::mem::take(&mut record.id);
            record.id = (1_u64..)
                .map(|n| format!("{base}-{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or(base);
        }
        taken.insert(record.id.clone());
    }
}

/// Validates one row. The flag is `true` when the id came from the source
/// rather than being synthesized from `index`.
fn validate_row(
    index: usize,
    row: RawIncidentRow,
    seen_ids: &BTreeSet<String>,
    categories: &BTreeSet<String>,
    options: IngestOptions,
) -> Result<(IncidentRecord, bool), RejectionReason> {
    let timestamp =
        parsing::non_blank(row.timestamp.as_deref()).ok_or(RejectionReason::MissingTimestamp)?;
    let occurred_at =
        parsing::parse_timestamp(timestamp).ok_or(RejectionReason::InvalidTimestamp)?;

    let (latitude, longitude) =
        parsing::parse_coordinates(row.latitude.as_deref(), row.longitude.as_deref())?;

    let category = row
        .category
        .as_deref()
        .and_then(normalize_category)
        .ok_or(RejectionReason::MissingCategory)?;
    if !categories.contains(&category) && categories.len() >= options.max_categories {
        return Err(RejectionReason::CategoryLimitExceeded);
    }

    let source_id = parsing::non_blank(row.id.as_deref()).map(ToString::to_string);
    if source_id.as_ref().is_some_and(|id| seen_ids.contains(id)) {
        return Err(RejectionReason::DuplicateId);
    }
    let explicit_id = source_id.is_some();

    let record = IncidentRecord {
        id: source_id.unwrap_or_else(|| format!("row-{index}")),
        occurred_at,
        latitude,
        longitude,
        category,
        arrest: parsing::parse_arrest(row.arrest.as_deref()),
    };
    Ok((record, explicit_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>, ts: &str, lat: &str, lng: &str, cat: &str) -> RawIncidentRow {
        RawIncidentRow {
            id: id.map(ToString::to_string),
            timestamp: Some(ts.to_string()),
            latitude: Some(lat.to_string()),
            longitude: Some(lng.to_string()),
            category: Some(cat.to_string()),
            arrest: None,
        }
    }

    #[test]
    fn accepts_valid_rows_in_order() {
        let set = load(vec![
            row(Some("a"), "2024-01-01T10:00:00", "41.9", "-87.6", " theft "),
            row(Some("b"), "2024-01-02T10:00:00", "41.8", "-87.7", "Battery"),
        ])
        .unwrap();

        let ids: Vec<&str> = set.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.records()[0].category, "THEFT");
        assert_eq!(set.records()[1].category, "BATTERY");
        assert_eq!(set.report().accepted, 2);
        assert_eq!(set.report().rejected(), 0);
    }

    #[test]
    fn counts_rejections_without_failing() {
        let mut missing_ts = row(Some("c"), "", "41.9", "-87.6", "THEFT");
        missing_ts.timestamp = None;

        let set = load(vec![
            row(Some("a"), "2024-01-01T10:00:00", "41.9", "-87.6", "THEFT"),
            row(Some("b"), "2024-01-01T10:00:00", "95.0", "-87.6", "THEFT"),
            missing_ts,
            row(Some("d"), "2024-01-01T10:00:00", "41.9", "-200", "THEFT"),
            row(Some("e"), "2024-01-01T10:00:00", "41.9", "-87.6", "  "),
            row(Some("a"), "2024-01-01T11:00:00", "41.9", "-87.6", "THEFT"),
        ])
        .unwrap();

        let report = set.report();
        assert_eq!(set.len(), 1);
        assert_eq!(report.total_rows, 6);
        assert_eq!(report.rejected(), 5);
        for reason in [
            RejectionReason::LatitudeOutOfRange,
            RejectionReason::MissingTimestamp,
            RejectionReason::LongitudeOutOfRange,
            RejectionReason::MissingCategory,
            RejectionReason::DuplicateId,
        ] {
            assert_eq!(report.rejections.get(&reason), Some(&1), "{reason}");
        }
    }

    #[test]
    fn empty_after_validation_is_data_integrity_error() {
        let err = load(vec![row(Some("a"), "garbage", "41.9", "-87.6", "THEFT")]).unwrap_err();
        match err {
            IngestError::DataIntegrity {
                total_rows,
                rejected,
                report,
            } => {
                assert_eq!(total_rows, 1);
                assert_eq!(rejected, 1);
                assert_eq!(
                    report.rejections.get(&RejectionReason::InvalidTimestamp),
                    Some(&1)
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_data_integrity_error() {
        assert!(matches!(
            load(Vec::new()),
            Err(IngestError::DataIntegrity { total_rows: 0, .. })
        ));
    }

    #[test]
    fn synthesizes_missing_ids() {
        let set = load(vec![
            row(None, "2024-01-01T10:00:00", "41.9", "-87.6", "THEFT"),
            row(None, "2024-01-01T10:00:00", "41.9", "-87.6", "THEFT"),
        ])
        .unwrap();
        assert_eq!(set.records()[0].id, "row-0");
        assert_eq!(set.records()[1].id, "row-1");
    }

    #[test]
    fn source_ids_shaped_like_synthesized_ids_are_kept() {
        let set = load(vec![
            row(None, "2024-01-01T10:00:00", "41.9", "-87.6", "THEFT"),
            row(Some("row-0"), "2024-01-01T11:00:00", "41.9", "-87.6", "THEFT"),
            row(Some("row-0-1"), "2024-01-01T12:00:00", "41.9", "-87.6", "THEFT"),
            row(None, "2024-01-01T13:00:00", "41.9", "-87.6", "THEFT"),
        ])
        .unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(set.report().rejected(), 0);
        let ids: Vec<&str> = set.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["row-0-2", "row-0", "row-0-1", "row-3"]);
    }

    #[test]
    fn bounds_category_vocabulary() {
        let set = load_with_options(
            vec![
                row(Some("a"), "2024-01-01T10:00:00", "41.9", "-87.6", "THEFT"),
                row(Some("b"), "2024-01-01T10:00:00", "41.9", "-87.6", "BATTERY"),
                row(Some("c"), "2024-01-01T10:00:00", "41.9", "-87.6", "theft"),
            ],
            IngestOptions { max_categories: 1 },
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.report()
                .rejections
                .get(&RejectionReason::CategoryLimitExceeded),
            Some(&1)
        );
    }

    #[test]
    fn coerces_offset_timestamps_to_utc() {
        let set = load(vec![row(
            Some("a"),
            "2024-06-01T23:30:00-05:00",
            "41.9",
            "-87.6",
            "THEFT",
        )])
        .unwrap();
        assert_eq!(
            set.records()[0].occurred_at.to_string(),
            "2024-06-02 04:30:00 UTC"
        );
    }
}
