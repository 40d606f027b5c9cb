//! Day-by-hour heatmap and daily rolling series.
//!
//! Binning is a pure fold over the records: the same records and window
//! always produce the same grid and series. Records outside the window are
//! ignored.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use crime_hotspots_analytics_models::{
    DailyCount, HourCount, RollingSeries, TemporalGrid, WeekdayCount,
};
use crime_hotspots_crime_models::{IncidentRecord, Weekday};

use crate::filter::TimeWindow;

/// Bins in-window records into the 7x24 grid and the daily series.
#[must_use]
pub fn aggregate<R: Borrow<IncidentRecord>>(
    records: &[R],
    window: &TimeWindow,
) -> (TemporalGrid, RollingSeries) {
    let mut grid = TemporalGrid::default();
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for record in records.iter().map(Borrow::<IncidentRecord>::borrow) {
        if !window.contains(record.occurred_at) {
            continue;
        }
        grid.increment(record.weekday().index(), usize::from(record.hour()));
        *per_day.entry(record.occurred_at.date_naive()).or_insert(0) += 1;
    }

    let first_day = window.start.date_naive();
    let last_day = window.end.date_naive();
    let days = first_day
        .iter_days()
        .take_while(|day| *day <= last_day)
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    let series = RollingSeries {
        window_days: window.days,
        window_start: window.start,
        anchor: window.end,
        days,
    };

    (grid, series)
}

/// Hour-of-day totals from a grid, hour 0 first.
#[must_use]
pub fn hourly_distribution(grid: &TemporalGrid) -> Vec<HourCount> {
    grid.hourly_totals()
        .into_iter()
        .enumerate()
        .map(|(hour, count)| {
            // At most 24 entries
            #[allow(clippy::cast_possible_truncation)]
            let hour = hour as u8;
            HourCount { hour, count }
        })
        .collect()
}

/// Weekday totals from a grid, Monday first.
#[must_use]
pub fn weekday_distribution(grid: &TemporalGrid) -> Vec<WeekdayCount> {
    Weekday::all()
        .iter()
        .zip(grid.weekday_totals())
        .map(|(&weekday, count)| WeekdayCount { weekday, count })
        .collect()
}

/// Busiest hour, lowest hour on ties. `None` if the grid is empty.
#[must_use]
pub fn peak_hour(grid: &TemporalGrid) -> Option<u8> {
    let totals = grid.hourly_totals();
    let max = *totals.iter().max()?;
    if max == 0 {
        return None;
    }
    totals.iter().position(|&count| count == max).and_then(|h| u8::try_from(h).ok())
}
