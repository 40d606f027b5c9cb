//! Command-line filter options layered over the engine configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;
use crime_hotspots_analytics::{AnalyticsError, EngineConfig};
use crime_hotspots_analytics_models::{BoundingRegion, FilterState};
use crime_hotspots_crime_models::normalize_category;

/// Options shared by every command that builds a filter state.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Engine configuration file (TOML). Built-in defaults when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Clustering radius in meters (overrides the config file)
    #[arg(long)]
    pub epsilon_meters: Option<f64>,
    /// Minimum neighborhood size for a core point (overrides the config file)
    #[arg(long)]
    pub min_points: Option<usize>,
    /// Rolling window length in days (overrides the config file)
    #[arg(long)]
    pub window_days: Option<u32>,
    /// Only include this category. Repeat to include several.
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Only include records of this cluster id. Repeat to include several.
    #[arg(long = "cluster")]
    pub clusters: Vec<u32>,
    /// Bounding region as `min_lat,min_lon,max_lat,max_lon`
    #[arg(long, value_parser = parse_bbox)]
    pub bbox: Option<BoundingRegion>,
}

impl FilterArgs {
    /// Loads the configuration file, or the defaults if none was given.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the file cannot be read or is
    /// invalid.
    pub fn engine_config(&self) -> Result<EngineConfig, AnalyticsError> {
        match &self.config {
            Some(path) => EngineConfig::from_path(path),
            None => Ok(EngineConfig::default()),
        }
    }

    /// The configuration's initial filter state with every flag applied.
    ///
    /// Category names are normalized the same way ingestion normalizes
    /// them, so `--category "motor vehicle theft"` matches
    /// `MOTOR VEHICLE THEFT`.
    #[must_use]
    pub fn filter_state(&self, config: &EngineConfig) -> FilterState {
        let mut state = config.initial_filter();

        if let Some(epsilon_meters) = self.epsilon_meters {
            state.epsilon_meters = epsilon_meters;
        }
        if let Some(min_points) = self.min_points {
            state.min_points = min_points;
        }
        if let Some(window_days) = self.window_days {
            state.window_days = window_days;
        }
        state.selected_categories = self
            .categories
            .iter()
            .filter_map(|c| normalize_category(c))
            .collect();
        state.selected_clusters = self.clusters.iter().copied().collect::<BTreeSet<_>>();
        state.bounding_region = self.bbox;

        state
    }
}

/// Parses `min_lat,min_lon,max_lat,max_lon`.
///
/// Only the shape is checked here; range and ordering are validated by the
/// engine along with the rest of the filter state.
///
/// # Errors
///
/// Returns a message if there are not exactly four numeric fields.
pub fn parse_bbox(value: &str) -> Result<BoundingRegion, String> {
    let fields = value
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid coordinate '{}': {e}", field.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [min_latitude, min_longitude, max_latitude, max_longitude] = fields[..] else {
        return Err(format!(
            "expected 4 comma-separated values (min_lat,min_lon,max_lat,max_lon), got {}",
            fields.len()
        ));
    };

    Ok(BoundingRegion {
        min_latitude,
        min_longitude,
        max_latitude,
        max_longitude,
    })
}
