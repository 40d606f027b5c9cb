//! Headline indicators and category composition.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use crime_hotspots_analytics_models::{CategoryShare, ClusterSummary, Kpis, TemporalGrid};
use crime_hotspots_crime_models::IncidentRecord;

use crate::temporal::peak_hour;

/// Running count of arrests among records with a known arrest flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ArrestTally {
    arrests: u64,
    known: u64,
}

impl ArrestTally {
    pub(crate) fn add(&mut self, arrest: Option<bool>) {
        match arrest {
            Some(true) => {
                self.arrests += 1;
                self.known += 1;
            }
            Some(false) => self.known += 1,
            None => {}
        }
    }

    pub(crate) const fn arrests(&self) -> u64 {
        self.arrests
    }

    /// Arrests over known flags, or 0 when no flag is known.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn rate(&self) -> f64 {
        if self.known == 0 {
            0.0
        } else {
            self.arrests as f64 / self.known as f64
        }
    }
}

/// Computes the headline indicators for a selected record set.
///
/// `summaries` and `grid` must have been derived from the same records.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_kpis<R: Borrow<IncidentRecord>>(
    records: &[R],
    summaries: &[ClusterSummary],
    grid: &TemporalGrid,
    window_days: u32,
) -> Kpis {
    let mut tally = ArrestTally::default();
    let mut categories = BTreeSet::new();
    for r in records {
        let record: &IncidentRecord = r.borrow();
        tally.add(record.arrest);
        categories.insert(record.category.as_str());
    }

    let avg_per_hotspot = if summaries.is_empty() {
        0.0
    } else {
        records.len() as f64 / summaries.len() as f64
    };
    let avg_per_day = if window_days == 0 {
        0.0
    } else {
        records.len() as f64 / f64::from(window_days)
    };

    Kpis {
        total_arrests: tally.arrests(),
        arrest_rate: tally.rate(),
        avg_per_hotspot,
        avg_per_day,
        peak_hour: peak_hour(grid),
        largest_hotspot: summaries.iter().map(|s| s.size).max().unwrap_or(0),
        distinct_categories: categories.len() as u64,
    }
}

/// The `top_n` most frequent categories, by count descending and then
/// label ascending.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn category_breakdown<R: Borrow<IncidentRecord>>(
    records: &[R],
    top_n: usize,
) -> Vec<CategoryShare> {
    let mut counts: BTreeMap<&str, (u64, ArrestTally)> = BTreeMap::new();
    for r in records {
        let record: &IncidentRecord = r.borrow();
        let entry = counts.entry(record.category.as_str()).or_default();
        entry.0 += 1;
        entry.1.add(record.arrest);
    }

    let total = records.len();
    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(category, (count, arrests))| CategoryShare {
            category: category.to_string(),
            count,
            percentage: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
            arrest_rate: arrests.rate(),
        })
        .collect();

    // BTreeMap order already breaks ties by label; the sort is stable.
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares.truncate(top_n);
    shares
}
