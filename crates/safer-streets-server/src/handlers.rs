//! REST API handlers for the Safer Streets server

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    response::Json,
};
use safer_streets_core::wire::{
    CellCounts, CountsResponse, HealthResponse, HotspotsResponse, NationalHotspotsResponse,
    PfaAreaResponse, ReloadResponse,
};
use safer_streets_core::{
    analyze_persistence, hotspot_count_for_coverage, window_label, Area, AreaSummary,
    HotspotRepetition, Month, PersistenceReport, Record, RepetitionParams, SpatialUnit,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::ServerState;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ForceQuery {
    pub force: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub dataset: String,
    pub force: String,
}

#[derive(Debug, Deserialize)]
pub struct PersistenceQuery {
    pub force: String,
    pub series: String,
}

#[derive(Debug, Deserialize)]
pub struct CountsQuery {
    pub force: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct HotspotQuery {
    pub force: String,
    pub category: String,
    /// Comma-separated `YYYY-MM` list.
    pub months: String,
    #[serde(default = "default_n_hotspots")]
    pub n_hotspots: usize,
}

#[derive(Debug, Deserialize)]
pub struct NationalQuery {
    pub category: String,
    /// Comma-separated `YYYY-MM` list.
    pub months: String,
    #[serde(default = "default_n_hotspots")]
    pub n_hotspots: usize,
}

#[derive(Debug, Deserialize)]
pub struct RepetitionQuery {
    pub force: String,
    pub category: String,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_step")]
    pub step: usize,
    #[serde(default = "default_window")]
    pub prediction: usize,
    /// Percentage of the force's land area the hotspots may cover.
    #[serde(default = "default_coverage")]
    pub coverage: f64,
    /// Overrides the coverage-derived hotspot count.
    pub n_hotspots: Option<usize>,
}

fn default_n_hotspots() -> usize {
    10
}

fn default_window() -> usize {
    3
}

fn default_step() -> usize {
    1
}

fn default_coverage() -> f64 {
    1.0
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let catalog = state.repository.current();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        loaded_at: catalog.loaded_at(),
        data: catalog.stats(),
    })
}

/// Every force, in id order
pub async fn list_forces(State(state): State<Arc<ServerState>>) -> Json<Vec<AreaSummary>> {
    Json(state.repository.current().areas().list())
}

/// The resolved area
pub async fn get_area(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<ForceQuery>, QueryRejection>,
) -> ApiResult<Area> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    Ok(Json(area.clone()))
}

/// Land area of a police force area in km²
pub async fn pfa_area(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<ForceQuery>, QueryRejection>,
) -> ApiResult<PfaAreaResponse> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    let area_km2 = area
        .area_km2
        .ok_or_else(|| ApiError::NotFound(format!("no land area recorded for {}", area.name)))?;
    Ok(Json(PfaAreaResponse {
        force: area.summary(),
        area_km2,
    }))
}

/// One dataset record for a force
pub async fn get_record(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<RecordQuery>, QueryRejection>,
) -> ApiResult<Record> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    let record = catalog.record(&query.dataset, &area.id)?;
    Ok(Json(record.clone()))
}

/// Classification stability of a force over a snapshot series
pub async fn get_persistence(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<PersistenceQuery>, QueryRejection>,
) -> ApiResult<PersistenceReport> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    let snapshots = catalog.snapshots(&query.series)?;
    let report = analyze_persistence(&area.id, &snapshots)?;
    debug!(
        "Persistence of {} over {}: {:?}",
        area.id, query.series, report.stability
    );
    Ok(Json(report))
}

/// Monthly counts for every cell in a force
pub async fn get_counts(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<CountsQuery>, QueryRejection>,
) -> ApiResult<CountsResponse> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    let table = catalog.counts(&query.category)?;
    let counts = table.for_area(&area.id);
    Ok(Json(CountsResponse {
        force: area.summary(),
        category: table.category().to_string(),
        months: counts.months().to_vec(),
        cells: counts
            .rows()
            .iter()
            .map(|row| CellCounts {
                spatial_unit: row.spatial_unit,
                counts: row.counts.clone(),
            })
            .collect(),
    }))
}

/// Top cells summed over a list of months
pub async fn get_hotspots(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<HotspotQuery>, QueryRejection>,
) -> ApiResult<HotspotsResponse> {
    let Query(query) = query?;
    let months = parse_months(&query.months)?;
    if query.n_hotspots == 0 {
        return Err(ApiError::InvalidQuery("n_hotspots must be at least 1".to_string()));
    }
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;
    let table = catalog.counts(&query.category)?;
    let hotspots = table.for_area(&area.id).rank_hotspots(&months, query.n_hotspots)?;
    Ok(Json(HotspotsResponse {
        force: area.summary(),
        category: table.category().to_string(),
        label: window_label(&months),
        months,
        hotspots,
    }))
}

/// Top cells across every force
pub async fn get_national_hotspots(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<NationalQuery>, QueryRejection>,
) -> ApiResult<NationalHotspotsResponse> {
    let Query(query) = query?;
    let months = parse_months(&query.months)?;
    if query.n_hotspots == 0 {
        return Err(ApiError::InvalidQuery("n_hotspots must be at least 1".to_string()));
    }
    let catalog = state.repository.current();
    let table = catalog.counts(&query.category)?;
    let hotspots = table.rank_national(&months, query.n_hotspots)?;
    Ok(Json(NationalHotspotsResponse {
        category: table.category().to_string(),
        label: window_label(&months),
        months,
        hotspots,
    }))
}

/// Hotspot repetition over rolling windows
pub async fn get_repetition(
    State(state): State<Arc<ServerState>>,
    query: Result<Query<RepetitionQuery>, QueryRejection>,
) -> ApiResult<HotspotRepetition> {
    let Query(query) = query?;
    let catalog = state.repository.current();
    let area = catalog.resolve_area(&query.force)?;

    let n_hotspots = match (query.n_hotspots, area.area_km2) {
        (Some(n), _) => n,
        (None, Some(area_km2)) => {
            if !(query.coverage > 0.0 && query.coverage <= 100.0) {
                return Err(ApiError::InvalidQuery(
                    "coverage must be a percentage above 0 and at most 100".to_string(),
                ));
            }
            hotspot_count_for_coverage(query.coverage, area_km2)
        }
        (None, None) => {
            return Err(ApiError::InvalidQuery(format!(
                "{} has no recorded land area; pass n_hotspots",
                area.name
            )));
        }
    };

    let params = RepetitionParams {
        window: query.window,
        step: query.step,
        prediction: query.prediction,
        n_hotspots,
    };
    let area_id = area.id.clone();
    let category = query.category;
    let repetition = tokio::task::spawn_blocking(move || {
        catalog.counts(&category)?.for_area(&area_id).repetition(params)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("repetition task failed: {}", e)))??;
    Ok(Json(repetition))
}

/// GeoJSON features for the requested cells. Unknown ids are left out.
pub async fn get_hexes(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Vec<SpatialUnit>>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(ids) = body?;
    let catalog = state.repository.current();
    let features: Vec<Value> = catalog
        .cells(&ids)
        .into_iter()
        .map(|cell| {
            json!({
                "type": "Feature",
                "id": cell.spatial_unit,
                "properties": { "spatial_unit": cell.spatial_unit },
                "geometry": cell.geometry,
            })
        })
        .collect();
    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
    })))
}

/// Rebuild the catalog from disk and swap it in
pub async fn reload(State(state): State<Arc<ServerState>>) -> ApiResult<ReloadResponse> {
    let repository = Arc::clone(&state.repository);
    let catalog = tokio::task::spawn_blocking(move || repository.reload())
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {}", e)))??;
    info!("Reload requested through the API");
    Ok(Json(ReloadResponse {
        status: "reloaded".to_string(),
        loaded_at: catalog.loaded_at(),
        data: catalog.stats(),
    }))
}

fn parse_months(list: &str) -> Result<Vec<Month>, ApiError> {
    let mut months = list
        .split(',')
        .filter(|m| !m.trim().is_empty())
        .map(|m| m.parse::<Month>().map_err(ApiError::InvalidQuery))
        .collect::<Result<Vec<_>, _>>()?;
    if months.is_empty() {
        return Err(ApiError::InvalidQuery("at least one month is required".to_string()));
    }
    months.sort();
    months.dedup();
    Ok(months)
}
