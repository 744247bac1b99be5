//! Hotspot ranking and repetition over monthly crime counts
//!
//! A hotspot is one of the `n` spatial units with the most crime in a window
//! of months. Repetition slides that window over the whole timeline and
//! records how often each unit comes back, and how well one window's
//! hotspots capture the crime of the months that follow.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::measures::{gini, percentage, LorenzShares};
use crate::model::{AreaId, CountRow, CountTable, Month, Snapshot, SpatialUnit};
use crate::persistence::analyze_persistence;

/// Area of a regular hexagon with 200m sides, in km².
pub const HEX_AREA_KM2: f64 = 0.103_923_048_454_132_64;

pub const HOTSPOT: &str = "hotspot";
pub const BACKGROUND: &str = "background";

/// Number of hex cells that fit in `coverage_pct` percent of `area_km2`.
/// Always at least one.
pub fn hotspot_count_for_coverage(coverage_pct: f64, area_km2: f64) -> usize {
    let hotspot_area = coverage_pct * area_km2 / 100.0;
    let n = (hotspot_area / HEX_AREA_KM2).floor();
    if n.is_finite() && n >= 1.0 { n as usize } else { 1 }
}

/// `2024-01` for one month, `2024-01 to 2024-03` for several.
pub fn window_label(months: &[Month]) -> String {
    match months {
        [] => String::new(),
        [only] => only.to_string(),
        [first, .., last] => format!("{} to {}", first, last),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCell {
    pub spatial_unit: SpatialUnit,
    pub count: u64,
}

/// A ranked cell together with the force it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalHotspot {
    pub spatial_unit: SpatialUnit,
    pub area_id: AreaId,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionParams {
    /// Months aggregated per window.
    pub window: usize,
    /// Months the window advances each step.
    pub step: usize,
    /// Months after each window used to test the hotspots.
    pub prediction: usize,
    pub n_hotspots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub months: Vec<Month>,
    pub label: String,
    /// Share of the later months' crime inside this window's hotspots.
    pub predicted_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub months: Vec<Month>,
    pub label: String,
    /// Share of the window's crime inside its hotspots.
    pub captured_pct: f64,
    pub gini: f64,
    pub lorenz: LorenzShares,
    pub hotspots: Vec<SpatialUnit>,
    pub prediction: Option<PredictionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFrequency {
    pub spatial_unit: SpatialUnit,
    /// Windows in which the cell was a hotspot.
    pub count: usize,
    pub frequency_pct: f64,
    /// Fraction of consecutive windows keeping the same hotspot status.
    pub stability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotRepetition {
    pub category: String,
    pub area_id: AreaId,
    pub params: RepetitionParams,
    pub observations: usize,
    pub windows: Vec<WindowSummary>,
    /// Cells that were a hotspot at least once, most frequent first.
    pub cells: Vec<CellFrequency>,
}

/// A count table restricted to the cells of one area.
#[derive(Debug, Clone)]
pub struct AreaCounts<'a> {
    category: &'a str,
    area_id: AreaId,
    months: &'a [Month],
    rows: Vec<&'a CountRow>,
}

impl CountTable {
    pub fn for_area(&self, area_id: &AreaId) -> AreaCounts<'_> {
        AreaCounts {
            category: self.category(),
            area_id: area_id.clone(),
            months: self.months(),
            rows: self.rows().filter(|r| &r.area_id == area_id).collect(),
        }
    }

    /// Top `n` cells across every area, ranked the same way as
    /// [`AreaCounts::rank_hotspots`].
    pub fn rank_national(&self, months: &[Month], n: usize) -> Result<Vec<NationalHotspot>> {
        if months.is_empty() {
            return Err(CoreError::invalid_query("at least one month is required"));
        }
        let indices = month_indices(self.months(), months)?;
        let mut cells: Vec<NationalHotspot> = self
            .rows()
            .map(|row| NationalHotspot {
                spatial_unit: row.spatial_unit,
                area_id: row.area_id.clone(),
                count: indices.iter().map(|&i| row.counts[i]).sum(),
            })
            .filter(|c| c.count > 0)
            .collect();
        cells.sort_by(|a, b| b.count.cmp(&a.count).then(a.spatial_unit.cmp(&b.spatial_unit)));
        cells.truncate(n);
        Ok(cells)
    }
}

/// Positions of `months` in `timeline`. Unknown months are an error.
fn month_indices(timeline: &[Month], months: &[Month]) -> Result<Vec<usize>> {
    months
        .iter()
        .map(|m| {
            timeline
                .iter()
                .position(|x| x == m)
                .ok_or_else(|| CoreError::invalid_query(format!("no data for month {}", m)))
        })
        .collect()
}

impl<'a> AreaCounts<'a> {
    pub fn category(&self) -> &'a str {
        self.category
    }

    pub fn area_id(&self) -> &AreaId {
        &self.area_id
    }

    pub fn months(&self) -> &'a [Month] {
        self.months
    }

    pub fn rows(&self) -> &[&'a CountRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn totals(&self, indices: &[usize]) -> Vec<RankedCell> {
        self.rows
            .iter()
            .map(|row| RankedCell {
                spatial_unit: row.spatial_unit,
                count: indices.iter().map(|&i| row.counts[i]).sum(),
            })
            .collect()
    }

    /// Per-cell sums over `months`, in spatial unit order.
    pub fn window_counts(&self, months: &[Month]) -> Result<Vec<RankedCell>> {
        let indices = month_indices(self.months, months)?;
        Ok(self.totals(&indices))
    }

    /// Top `n` cells by summed count, ties broken by ascending id.
    /// Cells without crime are never ranked.
    pub fn rank_hotspots(&self, months: &[Month], n: usize) -> Result<Vec<RankedCell>> {
        if months.is_empty() {
            return Err(CoreError::invalid_query("at least one month is required"));
        }
        Ok(top_n(self.window_counts(months)?, n))
    }

    /// Slide a window over the timeline and measure hotspot repetition.
    pub fn repetition(&self, params: RepetitionParams) -> Result<HotspotRepetition> {
        if params.window == 0 || params.step == 0 || params.prediction == 0 || params.n_hotspots == 0 {
            return Err(CoreError::invalid_query(
                "window, step, prediction and hotspot count must be at least 1",
            ));
        }
        if self.rows.is_empty() {
            return Err(CoreError::insufficient_data(
                &self.area_id,
                format!("no {} counts for this area", self.category),
            ));
        }
        let len = self.months.len();
        if params.window > len {
            return Err(CoreError::insufficient_data(
                &self.area_id,
                format!("a {}-month window needs more than {} months of data", params.window, len),
            ));
        }

        let mut windows = Vec::new();
        let mut snapshots: Vec<Snapshot<SpatialUnit>> = Vec::new();
        // Offsets past the timeline end the walk instead of overflowing
        let mut start: usize = 0;
        while let Some(end) = start.checked_add(params.window).filter(|&end| end <= len) {
            let indices: Vec<usize> = (start..end).collect();
            let totals = self.totals(&indices);
            let window_total: u64 = totals.iter().map(|c| c.count).sum();
            let hotspots = top_n(totals.clone(), params.n_hotspots);
            let captured: u64 = hotspots.iter().map(|c| c.count).sum();
            let hotspot_ids: Vec<SpatialUnit> = hotspots.iter().map(|c| c.spatial_unit).collect();
            let hotspot_set: BTreeSet<SpatialUnit> = hotspot_ids.iter().copied().collect();

            let later_end = end.checked_add(params.prediction).filter(|&later_end| later_end <= len);
            let prediction = later_end.map(|later_end| {
                let later: Vec<usize> = (end..later_end).collect();
                let later_totals = self.totals(&later);
                let later_total: u64 = later_totals.iter().map(|c| c.count).sum();
                let predicted: u64 = later_totals
                    .iter()
                    .filter(|c| hotspot_set.contains(&c.spatial_unit))
                    .map(|c| c.count)
                    .sum();
                let months = self.months[end..later_end].to_vec();
                PredictionSummary {
                    label: window_label(&months),
                    months,
                    predicted_pct: percentage(predicted, later_total),
                }
            });

            let months = self.months[start..end].to_vec();
            let counts: Vec<u64> = totals.iter().map(|c| c.count).collect();
            snapshots.push(Snapshot::new(
                window_label(&months),
                totals
                    .iter()
                    .map(|c| {
                        let class = if hotspot_set.contains(&c.spatial_unit) { HOTSPOT } else { BACKGROUND };
                        (c.spatial_unit, class.to_string())
                    })
                    .collect(),
            ));
            windows.push(WindowSummary {
                label: window_label(&months),
                months,
                captured_pct: percentage(captured, window_total),
                gini: gini(&counts),
                lorenz: LorenzShares::from_counts(&counts),
                hotspots: hotspot_ids,
                prediction,
            });
            match start.checked_add(params.step) {
                Some(next) => start = next,
                None => break,
            }
        }

        let observations = windows.len();
        let mut appearances: BTreeMap<SpatialUnit, usize> = BTreeMap::new();
        for window in &windows {
            for unit in &window.hotspots {
                *appearances.entry(*unit).or_default() += 1;
            }
        }

        let mut cells = Vec::with_capacity(appearances.len());
        for (unit, count) in appearances {
            let report = analyze_persistence(&unit, &snapshots)?;
            cells.push(CellFrequency {
                spatial_unit: unit,
                count,
                frequency_pct: percentage(count as u64, observations as u64),
                stability: report.stability,
            });
        }
        cells.sort_by(|a, b| b.count.cmp(&a.count).then(a.spatial_unit.cmp(&b.spatial_unit)));

        Ok(HotspotRepetition {
            category: self.category.to_string(),
            area_id: self.area_id.clone(),
            params,
            observations,
            windows,
            cells,
        })
    }
}

fn top_n(mut cells: Vec<RankedCell>, n: usize) -> Vec<RankedCell> {
    cells.retain(|c| c.count > 0);
    cells.sort_by(|a, b| b.count.cmp(&a.count).then(a.spatial_unit.cmp(&b.spatial_unit)));
    cells.truncate(n);
    cells
}
