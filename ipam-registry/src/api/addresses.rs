//! Address record endpoints
//!
//! Thin JSON wrappers over [`RegistryEngine`](crate::registry::RegistryEngine).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ipam_common::{AddressRecord, AddressStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::registry::NewAddress;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    pub region: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddressRequest {
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnersRequest {
    #[serde(default)]
    pub owners: Vec<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: Uuid,
    pub status: AddressStatus,
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("invalid address id '{}': {}", raw, e)))
}

/// POST /api/addresses
pub async fn create_address(
    State(state): State<AppState>,
    Json(req): Json<CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let mut new = NewAddress::new(req.address)
        .with_tags(req.tags)
        .with_owners(req.owners);
    if let Some(region) = req.region {
        new = new.with_region(region);
    }

    let id = state.engine.add_record(&new).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/addresses/:id
pub async fn get_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AddressRecord>> {
    let id = parse_id(&id)?;
    Ok(Json(state.engine.load_record(id).await?))
}

/// PUT /api/addresses/:id
pub async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAddressRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let id = parse_id(&id)?;
    let status = state
        .engine
        .update_record(id, &req.address, &req.tags, &req.owners)
        .await?;
    Ok(Json(StatusResponse { id, status }))
}

/// PUT /api/addresses/:id/owners
///
/// An empty list unassigns the address.
pub async fn reassign_owners(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OwnersRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let id = parse_id(&id)?;
    let status = state
        .engine
        .reassign_owners(id, &req.owners, req.region.as_deref())
        .await?;
    Ok(Json(StatusResponse { id, status }))
}

/// PUT /api/addresses/:id/tags
pub async fn retag_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TagsRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.engine.retag_address(id, &req.tags).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/addresses/:id/address
pub async fn rename_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.engine.rename_address(id, &req.address).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/addresses/:id
pub async fn delete_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.engine.delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
