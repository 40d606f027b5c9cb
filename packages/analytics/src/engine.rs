//! The filter/query engine.
//!
//! An [`AnalyticsEngine`] owns one static [`RecordSet`] and the current
//! [`FilterState`]. Every call to [`AnalyticsEngine::apply_filter`]
//! recomputes a complete [`AnalysisSnapshot`] from a single selected record
//! set, so no snapshot ever mixes stale and fresh values. Snapshots are
//! handed out as shared immutable values: a caller holding one keeps seeing
//! exactly what was computed for its filter state, whatever the engine does
//! afterwards.
//!
//! Selection runs in two stages. The base set is every record passing the
//! category, time-window, and region predicates; it is clustered as a
//! whole. Cluster selection then keeps only base records whose label is in
//! the selected set. Clustering of the base set is memoized, so changing
//! only the cluster selection does not re-run the clustering pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use crime_hotspots_analytics_models::{
    AnalysisSnapshot, BoundingRegion, FilterState, SnapshotWarning,
};
use crime_hotspots_cluster::cluster;
use crime_hotspots_cluster_models::{ClusterAssignment, ClusterLabel};
use crime_hotspots_crime_models::IncidentRecord;
use crime_hotspots_ingest_models::{RawIncidentRow, RecordSet};

use crate::AnalyticsError;
use crate::config::EngineConfig;
use crate::filter::{TimeWindow, passes_predicates, time_window, validate};
use crate::kpi::{category_breakdown, compute_kpis};
use crate::summary::summarize_labeled;
use crate::temporal::{aggregate, hourly_distribution, weekday_distribution};

/// The parts of a filter state that determine the clustered base set.
#[derive(Debug, Clone, PartialEq)]
struct BaseKey {
    window_days: u32,
    categories: BTreeSet<String>,
    region: Option<BoundingRegion>,
    epsilon_meters: f64,
    min_points: usize,
}

impl BaseKey {
    fn of(state: &FilterState) -> Self {
        Self {
            window_days: state.window_days,
            categories: state.selected_categories.clone(),
            region: state.bounding_region,
            epsilon_meters: state.epsilon_meters,
            min_points: state.min_points,
        }
    }
}

/// A clustered base set: record indices and their labels, position by
/// position.
#[derive(Debug)]
struct ClusteredBase {
    key: BaseKey,
    indices: Vec<usize>,
    assignment: ClusterAssignment,
}

impl ClusteredBase {
    fn compute(
        records: &RecordSet,
        state: &FilterState,
        window: &TimeWindow,
    ) -> Result<Self, AnalyticsError> {
        let (indices, members): (Vec<usize>, Vec<&IncidentRecord>) = records
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| passes_predicates(record, state, window))
            .unzip();

        let assignment = cluster(&members, &state.cluster_params())?;

        Ok(Self {
            key: BaseKey::of(state),
            indices,
            assignment,
        })
    }
}

/// Stateful analytics session over one dataset.
#[derive(Debug)]
pub struct AnalyticsEngine {
    records: RecordSet,
    config: EngineConfig,
    state: FilterState,
    snapshot: Arc<AnalysisSnapshot>,
    clustered: Option<ClusteredBase>,
}

impl AnalyticsEngine {
    /// Builds an engine and computes the snapshot for the configuration's
    /// initial filter state.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::Config`] if `config` is inconsistent
    /// * [`AnalyticsError::Parameter`] if the initial filter state is invalid
    pub fn new(records: RecordSet, config: EngineConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let state = config.initial_filter();
        validate(&state, &config)?;
        let window = time_window(records.anchor(), state.window_days, &config)?;

        let clustered = ClusteredBase::compute(&records, &state, &window)?;
        let snapshot = build_snapshot(&records, &config, &state, &window, &clustered);

        log::info!(
            "Engine ready: {} records, anchor {}, {} hotspots in the last {} days",
            records.len(),
            records.anchor(),
            snapshot.active_hotspots,
            state.window_days
        );

        Ok(Self {
            records,
            config,
            state,
            snapshot: Arc::new(snapshot),
            clustered: Some(clustered),
        })
    }

    /// Validates raw rows with the configuration's ingestion options and
    /// builds an engine over the result.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::Ingest`] if no valid records remain
    /// * Any error from [`AnalyticsEngine::new`]
    pub fn load(
        rows: impl IntoIterator<Item = RawIncidentRow>,
        config: EngineConfig,
    ) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let records = crime_hotspots_ingest::load_with_options(rows, config.ingest_options())?;
        Self::new(records, config)
    }

    /// Replaces the filter state and recomputes the snapshot.
    ///
    /// The state is validated before any computation. On error the previous
    /// state and snapshot are kept unchanged. The returned snapshot is never
    /// modified by later calls; the last successful call decides what
    /// [`AnalyticsEngine::snapshot`] returns.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Parameter`] if `state` fails validation.
    pub fn apply_filter(
        &mut self,
        state: FilterState,
    ) -> Result<Arc<AnalysisSnapshot>, AnalyticsError> {
        validate(&state, &self.config)?;
        let window = time_window(self.records.anchor(), state.window_days, &self.config)?;

        let key = BaseKey::of(&state);
        let clustered = match self.clustered.take() {
            Some(cached) if cached.key == key => {
                log::debug!("Reusing clustering of {} base records", cached.indices.len());
                cached
            }
            stale => match ClusteredBase::compute(&self.records, &state, &window) {
                Ok(fresh) => fresh,
                Err(e) => {
                    self.clustered = stale;
                    return Err(e);
                }
            },
        };

        let snapshot = Arc::new(build_snapshot(
            &self.records,
            &self.config,
            &state,
            &window,
            &clustered,
        ));
        log::debug!(
            "Applied filter: {} records, {} hotspots, {} noise",
            snapshot.filtered_record_count,
            snapshot.active_hotspots,
            snapshot.noise_count
        );

        self.clustered = Some(clustered);
        self.state = state;
        self.snapshot = Arc::clone(&snapshot);
        Ok(snapshot)
    }

    /// The filter state behind the current snapshot.
    #[must_use]
    pub const fn state(&self) -> &FilterState {
        &self.state
    }

    /// The most recently computed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AnalysisSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// The static dataset.
    #[must_use]
    pub const fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_snapshot(
    records: &RecordSet,
    config: &EngineConfig,
    state: &FilterState,
    window: &TimeWindow,
    clustered: &ClusteredBase,
) -> AnalysisSnapshot {
    let all = records.records();
    let (selected, labels): (Vec<&IncidentRecord>, Vec<ClusterLabel>) = clustered
        .indices
        .iter()
        .zip(clustered.assignment.entries())
        .filter(|(_, entry)| {
            state.selected_clusters.is_empty()
                || entry
                    .label
                    .cluster_id()
                    .is_some_and(|id| state.selected_clusters.contains(&id))
        })
        .filter_map(|(&index, entry)| all.get(index).map(|record| (record, entry.label)))
        .unzip();

    let cluster_summaries = summarize_labeled(&selected, &labels);
    let (temporal_grid, rolling_series) = aggregate(&selected, window);
    let kpis = compute_kpis(&selected, &cluster_summaries, &temporal_grid, state.window_days);
    let category_breakdown = category_breakdown(&selected, config.top_categories);

    let filtered_record_count = selected.len() as u64;
    let noise_count = labels.iter().filter(|label| label.is_noise()).count() as u64;
    let noise_ratio = if filtered_record_count == 0 {
        0.0
    } else {
        noise_count as f64 / filtered_record_count as f64
    };

    let mut warnings = Vec::new();
    if filtered_record_count == 0 {
        log::warn!("Filter matched no records");
        warnings.push(SnapshotWarning::EmptyResult);
    }

    AnalysisSnapshot {
        filter: state.clone(),
        filtered_record_count,
        active_hotspots: cluster_summaries.len() as u64,
        noise_count,
        noise_ratio,
        hourly_distribution: hourly_distribution(&temporal_grid),
        weekday_distribution: weekday_distribution(&temporal_grid),
        cluster_summaries,
        temporal_grid,
        rolling_series,
        category_breakdown,
        kpis,
        ingest: records.report().clone(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
    use crime_hotspots_cluster_models::ClusterParams;
    use crime_hotspots_ingest_models::IngestReport;
    use proptest::prelude::*;

    use crate::ParameterError;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(id: &str, lat: f64, lng: f64, category: &str, hours_ago: i64) -> IncidentRecord {
        IncidentRecord {
            id: id.to_string(),
            occurred_at: base_time() - TimeDelta::hours(hours_ago),
            latitude: lat,
            longitude: lng,
            category: category.to_string(),
            arrest: None,
        }
    }

    fn engine(records: Vec<IncidentRecord>, config: EngineConfig) -> AnalyticsEngine {
        let set = RecordSet::new(records, IngestReport::default()).unwrap();
        AnalyticsEngine::new(set, config).unwrap()
    }

    fn three_point_engine() -> AnalyticsEngine {
        engine(
            vec![
                record("p1", 0.0, 0.0, "THEFT", 0),
                record("p2", 0.0, 0.0001, "THEFT", 0),
                record("p3", 10.0, 10.0, "THEFT", 0),
            ],
            EngineConfig::default(),
        )
    }

    fn state(epsilon_meters: f64, min_points: usize) -> FilterState {
        FilterState::unfiltered(
            30,
            ClusterParams {
                epsilon_meters,
                min_points,
            },
        )
    }

    #[test]
    fn three_point_example() {
        let mut engine = three_point_engine();
        let snapshot = engine.apply_filter(state(50.0, 2)).unwrap();

        assert_eq!(snapshot.filtered_record_count, 3);
        assert_eq!(snapshot.active_hotspots, 1);
        assert_eq!(snapshot.noise_count, 1);
        assert!((snapshot.noise_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(snapshot.cluster_summaries.len(), 1);
        assert_eq!(snapshot.cluster_summaries[0].size, 2);
        assert!(snapshot.warnings.is_empty());
    }

    #[test]
    fn initial_snapshot_uses_config_defaults() {
        let engine = three_point_engine();
        assert_eq!(engine.state(), &EngineConfig::default().initial_filter());
        assert_eq!(engine.snapshot().filtered_record_count, 3);
        // Default min_points of 5 leaves everything as noise
        assert_eq!(engine.snapshot().active_hotspots, 0);
    }

    #[test]
    fn window_excluding_every_selected_record_is_empty() {
        let mut records: Vec<IncidentRecord> = (0..4)
            .map(|i| record(&format!("old-{i}"), 41.9, -87.6, "THEFT", 24 * 20))
            .collect();
        records.push(record("anchor", 41.9, -87.6, "BATTERY", 0));
        let mut engine = engine(records, EngineConfig::default());

        let mut filter = state(50.0, 2);
        filter.window_days = 7;
        filter.selected_categories = BTreeSet::from(["THEFT".to_string()]);
        let snapshot = engine.apply_filter(filter).unwrap();

        assert_eq!(snapshot.filtered_record_count, 0);
        assert_eq!(snapshot.temporal_grid.total(), 0);
        assert!(snapshot.noise_ratio.abs() < f64::EPSILON);
        assert_eq!(snapshot.active_hotspots, 0);
        assert_eq!(snapshot.warnings, vec![SnapshotWarning::EmptyResult]);
        assert!(snapshot.rolling_series.days.iter().all(|d| d.count == 0));
    }

    #[test]
    fn invalid_state_keeps_previous_snapshot() {
        let mut engine = three_point_engine();
        let before = engine.apply_filter(state(50.0, 2)).unwrap();

        let err = engine.apply_filter(state(0.0, 2)).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Parameter(ParameterError::Clustering(_))
        ));

        let mut too_long = state(50.0, 2);
        too_long.window_days = 10_000;
        assert!(matches!(
            engine.apply_filter(too_long),
            Err(AnalyticsError::Parameter(ParameterError::WindowDays { .. }))
        ));

        let mut overflowing = state(50.0, 2);
        overflowing.window_days = u32::MAX;
        assert!(matches!(
            engine.apply_filter(overflowing),
            Err(AnalyticsError::Parameter(ParameterError::WindowDays { .. }))
        ));

        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.state(), &state(50.0, 2));
    }

    #[test]
    fn window_bound_beyond_calendar_is_rejected() {
        let set = || {
            RecordSet::new(
                vec![record("p1", 0.0, 0.0, "THEFT", 0)],
                IngestReport::default(),
            )
            .unwrap()
        };

        let unbounded = EngineConfig {
            max_window_days: u32::MAX,
            ..EngineConfig::default()
        };
        assert!(matches!(
            AnalyticsEngine::new(set(), unbounded),
            Err(AnalyticsError::Config { .. })
        ));

        let century = EngineConfig {
            max_window_days: crate::config::MAX_WINDOW_DAYS,
            ..EngineConfig::default()
        };
        let mut engine = AnalyticsEngine::new(set(), century).unwrap();
        let mut widest = state(50.0, 1);
        widest.window_days = crate::config::MAX_WINDOW_DAYS;
        let snapshot = engine.apply_filter(widest).unwrap();
        assert_eq!(snapshot.filtered_record_count, 1);
        assert_eq!(
            snapshot.rolling_series.days.len(),
            crate::config::MAX_WINDOW_DAYS as usize + 1
        );
    }

    #[test]
    fn earlier_snapshots_survive_later_filters() {
        let mut engine = three_point_engine();
        let clustered = engine.apply_filter(state(50.0, 2)).unwrap();

        let mut region = state(50.0, 2);
        region.bounding_region = Some(BoundingRegion {
            min_latitude: 9.0,
            min_longitude: 9.0,
            max_latitude: 11.0,
            max_longitude: 11.0,
        });
        let narrowed = engine.apply_filter(region).unwrap();

        assert_eq!(clustered.filtered_record_count, 3);
        assert_eq!(clustered.active_hotspots, 1);
        assert_eq!(clustered.filter, state(50.0, 2));
        assert_eq!(narrowed.filtered_record_count, 1);
        assert_eq!(engine.snapshot(), narrowed);
        assert_ne!(engine.snapshot(), clustered);
    }

    #[test]
    fn cluster_selection_excludes_noise_and_other_clusters() {
        let mut engine = engine(
            vec![
                record("a1", 41.9, -87.6, "THEFT", 1),
                record("a2", 41.9, -87.6001, "THEFT", 2),
                record("b1", 41.95, -87.65, "BATTERY", 3),
                record("b2", 41.95, -87.6501, "BATTERY", 4),
                record("n", 42.5, -88.0, "THEFT", 5),
            ],
            EngineConfig::default(),
        );

        let all = engine.apply_filter(state(50.0, 2)).unwrap();
        assert_eq!(all.active_hotspots, 2);

        let mut only_b = state(50.0, 2);
        only_b.selected_clusters = BTreeSet::from([1]);
        let snapshot = engine.apply_filter(only_b).unwrap();

        assert_eq!(snapshot.filtered_record_count, 2);
        assert_eq!(snapshot.noise_count, 0);
        assert_eq!(snapshot.active_hotspots, 1);
        assert_eq!(snapshot.cluster_summaries[0].cluster_id, 1);
        assert_eq!(snapshot.category_breakdown[0].category, "BATTERY");
    }

    #[test]
    fn unknown_cluster_selection_yields_empty_result() {
        let mut engine = three_point_engine();
        let mut filter = state(50.0, 2);
        filter.selected_clusters = BTreeSet::from([42]);
        let snapshot = engine.apply_filter(filter).unwrap();
        assert_eq!(snapshot.filtered_record_count, 0);
        assert_eq!(snapshot.warnings, vec![SnapshotWarning::EmptyResult]);
    }

    #[test]
    fn region_filter_limits_records() {
        let mut engine = three_point_engine();
        let mut filter = state(50.0, 2);
        filter.bounding_region = Some(BoundingRegion {
            min_latitude: 9.0,
            min_longitude: 9.0,
            max_latitude: 11.0,
            max_longitude: 11.0,
        });
        let snapshot = engine.apply_filter(filter).unwrap();
        assert_eq!(snapshot.filtered_record_count, 1);
        assert_eq!(snapshot.noise_count, 1);
    }

    #[test]
    fn load_rejects_empty_input() {
        let result = AnalyticsEngine::load(Vec::new(), EngineConfig::default());
        assert!(matches!(result, Err(AnalyticsError::Ingest(_))));
    }

    #[test]
    fn snapshot_carries_ingest_report() {
        let rows = vec![
            RawIncidentRow {
                id: Some("1".to_string()),
                timestamp: Some("2024-06-01T12:00:00Z".to_string()),
                latitude: Some("41.9".to_string()),
                longitude: Some("-87.6".to_string()),
                category: Some("theft".to_string()),
                arrest: Some("true".to_string()),
            },
            RawIncidentRow {
                id: Some("2".to_string()),
                timestamp: None,
                latitude: Some("41.9".to_string()),
                longitude: Some("-87.6".to_string()),
                category: Some("theft".to_string()),
                arrest: None,
            },
        ];
        let engine = AnalyticsEngine::load(rows, EngineConfig::default()).unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.ingest.total_rows, 2);
        assert_eq!(snapshot.ingest.accepted, 1);
        assert_eq!(snapshot.kpis.total_arrests, 1);
    }

    fn arb_records() -> impl Strategy<Value = Vec<IncidentRecord>> {
        prop::collection::vec(
            (
                41.880f64..41.884,
                -87.632f64..-87.628,
                0i64..(24 * 60),
                0usize..3,
                any::<Option<bool>>(),
            ),
            1..50,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (lat, lng, hours_ago, category, arrest))| IncidentRecord {
                    arrest,
                    ..record(
                        &format!("r{i}"),
                        lat,
                        lng,
                        ["THEFT", "BATTERY", "ASSAULT"][category],
                        hours_ago,
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn snapshot_invariants_hold(
            records in arb_records(),
            epsilon in 10.0f64..200.0,
            min_points in 1usize..5,
            window_days in 7u32..60,
        ) {
            let mut engine = engine(records, EngineConfig::default());
            let mut filter = state(epsilon, min_points);
            filter.window_days = window_days;
            let snapshot = engine.apply_filter(filter.clone()).unwrap();

            let clustered: u64 = snapshot.cluster_summaries.iter().map(|s| s.size).sum();
            prop_assert_eq!(clustered + snapshot.noise_count, snapshot.filtered_record_count);
            prop_assert_eq!(snapshot.temporal_grid.total(), snapshot.filtered_record_count);
            prop_assert_eq!(snapshot.rolling_series.total(), snapshot.filtered_record_count);

            let window = TimeWindow::ending_at(engine.records().anchor(), window_days).unwrap();
            let in_window = engine
                .records()
                .records()
                .iter()
                .filter(|r| window.contains(r.occurred_at))
                .count() as u64;
            prop_assert_eq!(snapshot.filtered_record_count, in_window);

            let again = engine.apply_filter(filter).unwrap();
            prop_assert_eq!(snapshot, again);
        }

        #[test]
        fn narrowing_categories_never_adds_records(records in arb_records()) {
            let mut engine = engine(records, EngineConfig::default());
            let mut filter = state(100.0, 2);

            filter.selected_categories =
                BTreeSet::from(["THEFT".to_string(), "BATTERY".to_string()]);
            let wide = engine.apply_filter(filter.clone()).unwrap().filtered_record_count;

            filter.selected_categories = BTreeSet::from(["THEFT".to_string()]);
            let narrow = engine.apply_filter(filter).unwrap().filtered_record_count;

            prop_assert!(narrow <= wide);
        }
    }
}
