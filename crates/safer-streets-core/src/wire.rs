//! Response bodies shared by the API server and its clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogStats;
use crate::hotspots::{NationalHotspot, RankedCell};
use crate::model::{AreaSummary, Month, SpatialUnit};

/// Header carrying the API key on every authenticated request.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub loaded_at: DateTime<Utc>,
    pub data: CatalogStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfaAreaResponse {
    pub force: AreaSummary,
    pub area_km2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellCounts {
    pub spatial_unit: SpatialUnit,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountsResponse {
    pub force: AreaSummary,
    pub category: String,
    pub months: Vec<Month>,
    pub cells: Vec<CellCounts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotsResponse {
    pub force: AreaSummary,
    pub category: String,
    pub label: String,
    pub months: Vec<Month>,
    pub hotspots: Vec<RankedCell>,
}

/// Top cells across every force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalHotspotsResponse {
    pub category: String,
    pub label: String,
    pub months: Vec<Month>,
    pub hotspots: Vec<NationalHotspot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub loaded_at: DateTime<Utc>,
    pub data: CatalogStats,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of `unauthorized`, `not_found`, `ambiguous`,
    /// `insufficient_data`, `invalid_query` or `internal`.
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<AreaSummary>>,
}
