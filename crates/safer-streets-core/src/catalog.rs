//! The loaded contents of one data root

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::{Area, AreaId, Cell, CountTable, Dataset, Record, Snapshot, SpatialUnit};
use crate::resolver::{AreaIndex, Resolution};

/// Everything loaded from a data root. Read-only once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub(crate) root: PathBuf,
    pub(crate) loaded_at: DateTime<Utc>,
    pub(crate) areas: AreaIndex,
    pub(crate) datasets: BTreeMap<String, Dataset>,
    pub(crate) counts: BTreeMap<String, CountTable>,
    pub(crate) cells: BTreeMap<SpatialUnit, Cell>,
}

/// Totals reported by health checks and the `check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub areas: usize,
    pub datasets: usize,
    pub series: usize,
    pub categories: usize,
    pub cells: usize,
}

impl Catalog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn areas(&self) -> &AreaIndex {
        &self.areas
    }

    pub fn resolve(&self, query: &str) -> Resolution<'_> {
        self.areas.resolve(query)
    }

    /// Resolve a name, turning ambiguity and misses into errors.
    pub fn resolve_area(&self, query: &str) -> Result<&Area> {
        self.areas.resolve(query).into_result(query)
    }

    pub fn dataset(&self, name: &str) -> Result<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| CoreError::DatasetNotFound { name: name.to_string() })
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }

    pub fn record(&self, dataset: &str, area_id: &AreaId) -> Result<&Record> {
        self.dataset(dataset)?
            .get(area_id)
            .ok_or_else(|| CoreError::RecordNotFound {
                dataset: dataset.to_string(),
                area_id: area_id.clone(),
            })
    }

    /// Names of every snapshot series, sorted.
    pub fn series(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .datasets
            .values()
            .filter_map(|d| d.meta().series.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Snapshots of a series, ordered by snapshot id.
    pub fn snapshots(&self, series: &str) -> Result<Vec<Snapshot>> {
        let mut snapshots: Vec<Snapshot> = self
            .datasets
            .values()
            .filter(|d| d.meta().series.as_deref() == Some(series))
            .filter_map(Snapshot::from_dataset)
            .collect();
        if snapshots.is_empty() {
            return Err(CoreError::SeriesNotFound { series: series.to_string() });
        }
        snapshots.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(snapshots)
    }

    pub fn counts(&self, category: &str) -> Result<&CountTable> {
        self.counts
            .get(category)
            .ok_or_else(|| CoreError::CategoryNotFound { category: category.to_string() })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Cells with known geometry among `ids`, in id order. Unknown ids are skipped.
    pub fn cells<'a>(&'a self, ids: &[SpatialUnit]) -> Vec<&'a Cell> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids.iter().filter_map(|id| self.cells.get(id)).collect()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            areas: self.areas.len(),
            datasets: self.datasets.len(),
            series: self.series().len(),
            categories: self.counts.len(),
            cells: self.cells.len(),
        }
    }

    /// Compare loaded content, ignoring the load time.
    pub fn content_eq(&self, other: &Catalog) -> bool {
        self.areas.iter().eq(other.areas.iter())
            && self.datasets.len() == other.datasets.len()
            && self
                .datasets
                .iter()
                .zip(other.datasets.iter())
                .all(|((a_name, a), (b_name, b))| a_name == b_name && a.content_eq(b))
            && self.counts == other.counts
            && self.cells == other.cells
    }
}
