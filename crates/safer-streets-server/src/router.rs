//! Axum router setup for the Safer Streets API

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::require_api_key,
    handlers::{
        get_area, get_counts, get_hexes, get_hotspots, get_national_hotspots, get_persistence,
        get_record, get_repetition, health_check, list_forces, pfa_area, reload,
    },
    ServerState,
};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    let protected = Router::new()
        .route("/forces", get(list_forces))
        .route("/area", get(get_area))
        .route("/pfa_area", get(pfa_area))
        .route("/records", get(get_record))
        .route("/persistence", get(get_persistence))
        .route("/counts", get(get_counts))
        .route("/hotspots", get(get_hotspots))
        .route("/hotspots/national", get(get_national_hotspots))
        .route("/hotspots/repetition", get(get_repetition))
        .route("/hexes", post(get_hexes))
        .route("/admin/reload", post(reload))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_api_key));

    Router::new()
        // Unauthenticated for load balancer health checks
        .route("/api/health", get(health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
