//! ipam-registry library
//!
//! IP address registry: heuristic import of delimited files and a
//! transactional engine for address ↔ tag and address ↔ owner links.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod classify;
pub mod error;
pub mod import;
pub mod registry;

use registry::RegistryEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub engine: RegistryEngine,
    /// Request gate secret; 0 disables the gate
    pub shared_secret: i64,
}

impl AppState {
    pub fn new(db: SqlitePool, default_region: impl Into<String>, shared_secret: i64) -> Self {
        let engine = RegistryEngine::new(db.clone(), default_region);
        Self {
            db,
            engine,
            shared_secret,
        }
    }
}

/// Build application router
///
/// Mutating routes and record reads sit behind the request gate. Health,
/// template, export and the region list are open.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/api/import", post(api::import_file))
        .route("/api/addresses", post(api::create_address))
        .route(
            "/api/addresses/:id",
            get(api::get_address)
                .put(api::update_address)
                .delete(api::delete_address),
        )
        .route("/api/addresses/:id/owners", put(api::reassign_owners))
        .route("/api/addresses/:id/tags", put(api::retag_address))
        .route("/api/addresses/:id/address", put(api::rename_address))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/template", get(api::download_template))
        .route("/api/export", get(api::download_export))
        .route("/api/regions", get(api::list_regions))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
