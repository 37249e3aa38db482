//! Analysis HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{AnalysisKind, AnalysisRecord, Pagination, RoiReport, SoilHealthReport};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::analysis::{RoiRequest, SoilHealthRequest};
use crate::services::AnalysisService;
use crate::AppState;

/// Request a soil health analysis (accepted, computed in the background)
pub async fn request_soil_health(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SoilHealthRequest>,
) -> AppResult<impl IntoResponse> {
    let accepted = AnalysisService::new(state.db.clone())
        .request_soil_health(user.user_id, request)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Request an ROI analysis
pub async fn request_roi(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<RoiRequest>,
) -> AppResult<impl IntoResponse> {
    let accepted = AnalysisService::new(state.db.clone())
        .request_roi(user.user_id, request)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn get_soil_health(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(analysis_id): Path<Uuid>,
) -> AppResult<Json<AnalysisRecord<SoilHealthReport>>> {
    let record = AnalysisService::new(state.db.clone())
        .get_analysis(user.user_id, analysis_id, AnalysisKind::SoilHealth)
        .await?;
    Ok(Json(record))
}

pub async fn get_roi(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(analysis_id): Path<Uuid>,
) -> AppResult<Json<AnalysisRecord<RoiReport>>> {
    let record = AnalysisService::new(state.db.clone())
        .get_analysis(user.user_id, analysis_id, AnalysisKind::Roi)
        .await?;
    Ok(Json(record))
}

/// Analysis history of a farm, newest first
pub async fn list_farm_analyses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    let page = AnalysisService::new(state.db.clone())
        .list_farm_analyses(user.user_id, farm_id, &pagination)
        .await?;
    Ok(Json(page))
}

/// Number of the caller's analyses per status
pub async fn get_queue_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let counts = AnalysisService::new(state.db.clone())
        .queue_counts(user.user_id)
        .await?;
    Ok(Json(counts))
}
