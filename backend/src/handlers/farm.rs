//! Farm management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{CreateFarmInput, UpdateFarmInput};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::FarmService;
use crate::AppState;

/// List the caller's farms
pub async fn list_farms(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let farms = FarmService::new(state.db.clone())
        .list_farms(user.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "farms": farms })))
}

/// Get a specific farm
pub async fn get_farm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let farm = FarmService::new(state.db.clone())
        .get_farm(user.user_id, farm_id)
        .await?;
    Ok(Json(farm))
}

/// Create a new farm
pub async fn create_farm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateFarmInput>,
) -> AppResult<impl IntoResponse> {
    let farm = FarmService::new(state.db.clone())
        .create_farm(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(farm)))
}

/// Update a farm
pub async fn update_farm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<UpdateFarmInput>,
) -> AppResult<impl IntoResponse> {
    let farm = FarmService::new(state.db.clone())
        .update_farm(user.user_id, farm_id, input)
        .await?;
    Ok(Json(farm))
}

/// Delete a farm
pub async fn delete_farm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    FarmService::new(state.db.clone())
        .delete_farm(user.user_id, farm_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grid tier and zone geometries of a farm
pub async fn get_farm_grid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let grid = FarmService::new(state.db.clone())
        .get_grid(user.user_id, farm_id)
        .await?;
    Ok(Json(grid))
}

/// Geometry of one zone; positions outside the grid are rejected
pub async fn get_farm_zone(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((farm_id, row, col)): Path<(Uuid, u32, u32)>,
) -> AppResult<impl IntoResponse> {
    let grid = FarmService::new(state.db.clone())
        .get_grid(user.user_id, farm_id)
        .await?;
    let zone = grid.zone_at(row, col)?.clone();
    Ok(Json(zone))
}
