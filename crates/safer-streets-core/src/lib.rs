//! Safer Streets core: area registry, datasets, resolution and persistence analysis

pub mod error;
pub mod model;
pub mod resolver;
pub mod catalog;
pub mod loader;
pub mod repository;
pub mod persistence;
pub mod hotspots;
pub mod measures;
pub mod wire;

#[cfg(test)]
pub mod tests;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_utils;

pub use error::{CoreError, Result};
pub use model::{Area, AreaId, AreaSummary, Cell, Centroid, CountRow, CountTable, Dataset, DatasetMeta, Month, Record, Snapshot, SpatialUnit};
pub use resolver::{AreaIndex, Resolution};
pub use catalog::{Catalog, CatalogStats};
pub use loader::{load_catalog, SCHEMA_VERSION};
pub use repository::Repository;
pub use persistence::{analyze_persistence, PersistenceReport, Transition};
pub use hotspots::{hotspot_count_for_coverage, window_label, AreaCounts, CellFrequency, HotspotRepetition, NationalHotspot, RankedCell, RepetitionParams, WindowSummary, HEX_AREA_KM2};
pub use measures::{gini, lorenz_share, LorenzShares};
pub use wire::{API_KEY_HEADER, ErrorBody};
