//! Loading a data root from disk
//!
//! Layout:
//!
//! ```text
//! <root>/areas.json            area registry (required)
//! <root>/datasets/<name>.json  one dataset per file
//! <root>/counts/<category>.json monthly crime counts per spatial unit
//! <root>/cells.json            GeoJSON geometry per spatial unit
//! ```
//!
//! Files are visited in sorted order, so two loads of the same directory
//! produce the same structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{CoreError, Result};
use crate::model::{Area, Cell, CountRow, CountTable, Dataset, DatasetMeta, Month, Record};
use crate::resolver::AreaIndex;

/// The only schema version this build reads.
pub const SCHEMA_VERSION: u32 = 1;

pub const AREAS_FILE: &str = "areas.json";
pub const DATASETS_DIR: &str = "datasets";
pub const COUNTS_DIR: &str = "counts";
pub const CELLS_FILE: &str = "cells.json";

#[derive(Deserialize)]
struct AreasFile {
    schema_version: u32,
    areas: Vec<Area>,
}

#[derive(Deserialize)]
struct DatasetFile {
    schema_version: u32,
    #[serde(default)]
    series: Option<String>,
    #[serde(default)]
    snapshot: Option<String>,
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct CountsFile {
    months: Vec<Month>,
    cells: Vec<CountRow>,
}

#[derive(Deserialize)]
struct CellsFile {
    cells: Vec<Cell>,
}

/// Load every file under `root` into a new catalog.
pub fn load_catalog(root: &Path) -> Result<Catalog> {
    if !root.is_dir() {
        return Err(CoreError::data_load(root, "data directory does not exist"));
    }
    info!("Loading data from {}", root.display());
    let loaded_at = Utc::now();

    let areas = load_areas(root)?;
    let datasets = load_datasets(root, &areas, loaded_at)?;
    let counts = load_counts(root, &areas)?;
    let cells = load_cells(root)?;

    let catalog = Catalog {
        root: root.to_path_buf(),
        loaded_at,
        areas,
        datasets,
        counts,
        cells,
    };
    let stats = catalog.stats();
    info!(
        "Loaded {} areas, {} datasets ({} series), {} count categories, {} cells",
        stats.areas, stats.datasets, stats.series, stats.categories, stats.cells
    );
    Ok(catalog)
}

fn load_areas(root: &Path) -> Result<AreaIndex> {
    let path = root.join(AREAS_FILE);
    let file: AreasFile = read_json(&path)?;
    check_schema(&path, file.schema_version)?;
    AreaIndex::build(file.areas)
        .map_err(|id| CoreError::data_load(&path, format!("duplicate area id {}", id)))
}

fn load_datasets(
    root: &Path,
    areas: &AreaIndex,
    loaded_at: chrono::DateTime<Utc>,
) -> Result<BTreeMap<String, Dataset>> {
    let mut datasets = BTreeMap::new();
    let mut tagged: BTreeMap<(String, String), String> = BTreeMap::new();
    for path in json_files(&root.join(DATASETS_DIR))? {
        let name = file_stem(&path)?;
        let file: DatasetFile = read_json(&path)?;
        check_schema(&path, file.schema_version)?;
        if file.series.is_some() && file.snapshot.is_none() {
            return Err(CoreError::data_load(&path, "a series dataset needs a snapshot tag"));
        }
        if let (Some(series), Some(snapshot)) = (&file.series, &file.snapshot) {
            let key = (series.clone(), snapshot.clone());
            if let Some(first) = tagged.insert(key, name.clone()) {
                return Err(CoreError::data_load(
                    &path,
                    format!("snapshot {} of series {} is already tagged by dataset {}", snapshot, series, first),
                ));
            }
        }

        let mut records = BTreeMap::new();
        for record in file.records {
            if !areas.contains(&record.area_id) {
                return Err(CoreError::data_load(
                    &path,
                    format!("record for unknown area {}", record.area_id),
                ));
            }
            if records.contains_key(&record.area_id) {
                return Err(CoreError::data_load(
                    &path,
                    format!("duplicate record for area {}", record.area_id),
                ));
            }
            records.insert(record.area_id.clone(), record);
        }

        debug!("Dataset {} has {} records", name, records.len());
        let meta = DatasetMeta {
            name: name.clone(),
            schema_version: file.schema_version,
            source_path: path.clone(),
            loaded_at,
            series: file.series,
            snapshot: file.snapshot,
        };
        datasets.insert(name, Dataset::new(meta, records));
    }
    Ok(datasets)
}

fn load_counts(root: &Path, areas: &AreaIndex) -> Result<BTreeMap<String, CountTable>> {
    let mut tables = BTreeMap::new();
    for path in json_files(&root.join(COUNTS_DIR))? {
        let category = file_stem(&path)?;
        let file: CountsFile = read_json(&path)?;

        if file.months.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::data_load(&path, "months must be strictly increasing"));
        }

        let mut rows = BTreeMap::new();
        for row in file.cells {
            if row.counts.len() != file.months.len() {
                return Err(CoreError::data_load(
                    &path,
                    format!(
                        "cell {} has {} counts for {} months",
                        row.spatial_unit,
                        row.counts.len(),
                        file.months.len()
                    ),
                ));
            }
            if !areas.contains(&row.area_id) {
                return Err(CoreError::data_load(
                    &path,
                    format!("cell {} belongs to unknown area {}", row.spatial_unit, row.area_id),
                ));
            }
            if rows.contains_key(&row.spatial_unit) {
                return Err(CoreError::data_load(
                    &path,
                    format!("duplicate cell {}", row.spatial_unit),
                ));
            }
            rows.insert(row.spatial_unit, row);
        }

        debug!("Category {} has {} cells over {} months", category, rows.len(), file.months.len());
        tables.insert(category.clone(), CountTable::new(category, file.months, rows));
    }
    Ok(tables)
}

fn load_cells(root: &Path) -> Result<BTreeMap<u64, Cell>> {
    let path = root.join(CELLS_FILE);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file: CellsFile = read_json(&path)?;
    let mut cells = BTreeMap::new();
    for cell in file.cells {
        if cells.insert(cell.spatial_unit, cell).is_some() {
            return Err(CoreError::data_load(&path, "duplicate cell geometry"));
        }
    }
    Ok(cells)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| CoreError::data_load(path, e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| CoreError::data_load(path, e.to_string()))
}

fn check_schema(path: &Path, version: u32) -> Result<()> {
    if version != SCHEMA_VERSION {
        return Err(CoreError::data_load(
            path,
            format!("unsupported schema version {} (expected {})", version, SCHEMA_VERSION),
        ));
    }
    Ok(())
}

/// `*.json` files directly under `dir`, sorted. A missing directory is empty.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| CoreError::data_load(dir, e.to_string()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CoreError::data_load(dir, e.to_string()))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::data_load(path, "file name is not valid UTF-8"))
}
