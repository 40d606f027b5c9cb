//! Engine configuration, loaded from TOML.
//!
//! Every key is optional:
//!
//! ```toml
//! epsilon_meters = 250.0
//! min_points = 5
//! default_window_days = 30
//! min_window_days = 7
//! max_window_days = 365
//! max_categories = 512
//! top_categories = 10
//! ```

use std::path::Path;

use crime_hotspots_analytics_models::FilterState;
use crime_hotspots_cluster_models::{ClusterParams, DEFAULT_EPSILON_METERS, DEFAULT_MIN_POINTS};
use crime_hotspots_ingest::{DEFAULT_MAX_CATEGORIES, IngestOptions};
use serde::{Deserialize, Serialize};

use crate::AnalyticsError;

/// Largest window any configuration may allow: one hundred years.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Static engine settings. Per-session choices live in [`FilterState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Initial clustering radius in meters.
    pub epsilon_meters: f64,
    /// Initial clustering density threshold.
    pub min_points: usize,
    /// Window length of the initial filter state.
    pub default_window_days: u32,
    /// Smallest accepted window.
    pub min_window_days: u32,
    /// Largest accepted window.
    pub max_window_days: u32,
    /// Bound on distinct category labels at ingestion.
    pub max_categories: usize,
    /// Number of categories in a snapshot's breakdown.
    pub top_categories: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon_meters: DEFAULT_EPSILON_METERS,
            min_points: DEFAULT_MIN_POINTS,
            default_window_days: 30,
            min_window_days: 7,
            max_window_days: 365,
            max_categories: DEFAULT_MAX_CATEGORIES,
            top_categories: 10,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the document is malformed or
    /// the values are inconsistent.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AnalyticsError> {
        let config: Self = toml::de::from_str(toml_str).map_err(|e| AnalyticsError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the file cannot be read or is
    /// invalid.
    pub fn from_path(path: &Path) -> Result<Self, AnalyticsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| AnalyticsError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that the window bounds are ordered and the defaults usable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] describing the first problem.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let fail = |message: String| Err(AnalyticsError::Config { message });

        if self.min_window_days == 0 {
            return fail("min_window_days must be at least 1".to_string());
        }
        if self.min_window_days > self.max_window_days {
            return fail(format!(
                "min_window_days ({}) exceeds max_window_days ({})",
                self.min_window_days, self.max_window_days
            ));
        }
        if self.max_window_days > MAX_WINDOW_DAYS {
            return fail(format!(
                "max_window_days ({}) exceeds the limit of {MAX_WINDOW_DAYS}",
                self.max_window_days
            ));
        }
        if !(self.min_window_days..=self.max_window_days).contains(&self.default_window_days) {
            return fail(format!(
                "default_window_days ({}) outside [{}, {}]",
                self.default_window_days, self.min_window_days, self.max_window_days
            ));
        }
        if self.max_categories == 0 {
            return fail("max_categories must be at least 1".to_string());
        }
        if let Err(e) = self.cluster_params().validate() {
            return fail(e.to_string());
        }
        Ok(())
    }

    /// Default clustering parameters.
    #[must_use]
    pub const fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            epsilon_meters: self.epsilon_meters,
            min_points: self.min_points,
        }
    }

    /// The filter state an engine starts with: default window and
    /// clustering parameters, no other filtering.
    #[must_use]
    pub fn initial_filter(&self) -> FilterState {
        FilterState::unfiltered(self.default_window_days, self.cluster_params())
    }

    /// Validation options for ingestion.
    #[must_use]
    pub const fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_categories: self.max_categories,
        }
    }
}
