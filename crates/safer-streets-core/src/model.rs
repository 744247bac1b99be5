//! Core data structures for areas, records, datasets and snapshots

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identifier of an area, e.g. the ONS code `E23000010`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub String);

impl AreaId {
    pub fn new(id: impl Into<String>) -> Self {
        AreaId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AreaId {
    fn from(id: &str) -> Self {
        AreaId(id.to_string())
    }
}

/// Identifier of a spatial unit (a 200m hex cell).
pub type SpatialUnit = u64;

/// Label centre of an area, in WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

/// A geographic unit such as a police force area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Land area in km².
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_km2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Centroid>,
    /// Statistics payload, opaque beyond key lookup.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Area {
    pub fn summary(&self) -> AreaSummary {
        AreaSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identifier and display name, used for pickers and ambiguity candidates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaSummary {
    pub id: AreaId,
    pub name: String,
}

/// One area's entry in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub area_id: AreaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Descriptive attributes of a loaded dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub name: String,
    pub schema_version: u32,
    /// Never sent over the wire.
    #[serde(skip)]
    pub source_path: PathBuf,
    pub loaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

/// An immutable, named collection of records keyed by area.
#[derive(Debug, Clone)]
pub struct Dataset {
    meta: DatasetMeta,
    records: BTreeMap<AreaId, Record>,
}

impl Dataset {
    pub fn new(meta: DatasetMeta, records: BTreeMap<AreaId, Record>) -> Self {
        Dataset { meta, records }
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn get(&self, area_id: &AreaId) -> Option<&Record> {
        self.records.get(area_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Same name, tags, schema and records. Load time and path are ignored.
    pub fn content_eq(&self, other: &Dataset) -> bool {
        self.meta.name == other.meta.name
            && self.meta.schema_version == other.meta.schema_version
            && self.meta.series == other.meta.series
            && self.meta.snapshot == other.meta.snapshot
            && self.records == other.records
    }
}

/// Classifications of a set of subjects at one point in time.
///
/// The subject set is fixed at construction; nothing can add, remove or
/// reclassify an entry afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<K = AreaId> {
    id: String,
    classes: Arc<BTreeMap<K, String>>,
}

impl<K: Ord> Snapshot<K> {
    pub fn new(id: impl Into<String>, classes: BTreeMap<K, String>) -> Self {
        Snapshot {
            id: id.into(),
            classes: Arc::new(classes),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn classification(&self, subject: &K) -> Option<&str> {
        self.classes.get(subject).map(String::as_str)
    }

    pub fn contains(&self, subject: &K) -> bool {
        self.classes.contains_key(subject)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Snapshot<AreaId> {
    /// Build a snapshot from a dataset tagged with a point in time.
    /// Records without a classification are left out.
    pub fn from_dataset(dataset: &Dataset) -> Option<Self> {
        let id = dataset.meta().snapshot.clone()?;
        let classes = dataset
            .records()
            .filter_map(|r| {
                r.classification
                    .as_ref()
                    .map(|c| (r.area_id.clone(), c.clone()))
            })
            .collect();
        Some(Snapshot::new(id, classes))
    }
}

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Month { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn succ(&self) -> Month {
        if self.month == 12 {
            Month { year: self.year + 1, month: 1 }
        } else {
            Month { year: self.year, month: self.month + 1 }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|_| format!("invalid month '{}', expected YYYY-MM", s))?;
        Ok(Month {
            year: date.year(),
            month: date.month(),
        })
    }
}

impl TryFrom<String> for Month {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Month> for String {
    fn from(m: Month) -> Self {
        m.to_string()
    }
}

/// Monthly crime counts for one spatial unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRow {
    pub spatial_unit: SpatialUnit,
    pub area_id: AreaId,
    pub counts: Vec<u64>,
}

/// Monthly crime counts of one category for every spatial unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CountTable {
    category: String,
    months: Vec<Month>,
    rows: BTreeMap<SpatialUnit, CountRow>,
}

impl CountTable {
    pub fn new(category: impl Into<String>, months: Vec<Month>, rows: BTreeMap<SpatialUnit, CountRow>) -> Self {
        CountTable {
            category: category.into(),
            months,
            rows,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn rows(&self) -> impl Iterator<Item = &CountRow> {
        self.rows.values()
    }

    pub fn row(&self, unit: SpatialUnit) -> Option<&CountRow> {
        self.rows.get(&unit)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Geometry of a spatial unit, kept as GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub spatial_unit: SpatialUnit,
    pub geometry: serde_json::Value,
}
