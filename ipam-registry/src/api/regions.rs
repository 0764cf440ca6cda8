//! Known region list

use axum::{extract::State, Json};
use ipam_common::db::load_regions;
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub default_region: String,
    pub regions: Vec<String>,
}

/// GET /api/regions
pub async fn list_regions(State(state): State<AppState>) -> ApiResult<Json<RegionsResponse>> {
    let regions = load_regions(&state.db).await?;
    Ok(Json(RegionsResponse {
        default_region: state.engine.default_region().to_string(),
        regions,
    }))
}
