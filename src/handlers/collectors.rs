//! Collector administration HTTP handlers (admin only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::AdminUser;
use crate::error::ApiError;
use crate::models::{
    CreateCollectorRequest, PaginatedResponse, PaginationParams, UpdateCollectorRequest,
    UserResponse,
};
use crate::state::AppState;

/// POST /api/collectors - Provision a collector account
pub async fn create_collector(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(req): Json<CreateCollectorRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    req.validate()?;

    let collector = state.auth_service.create_collector(req).await?;
    Ok((StatusCode::CREATED, Json(collector.into())))
}

/// GET /api/collectors - List collector accounts
pub async fn list_collectors(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let (collectors, total) = state.auth_service.list_collectors(page, limit).await?;
    let collectors = collectors.into_iter().map(UserResponse::from).collect();

    Ok(Json(PaginatedResponse::new(collectors, total, page, limit)))
}

/// GET /api/collectors/:id
pub async fn get_collector(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let collector = state.auth_service.get_user_by_id(id).await?;
    Ok(Json(collector.into()))
}

/// PUT /api/collectors/:id - Update profile fields
pub async fn update_collector(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCollectorRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    req.validate()?;

    let collector = state
        .auth_service
        .update_collector(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collector not found".to_string()))?;

    Ok(Json(collector.into()))
}

/// DELETE /api/collectors/:id - Deactivate and revoke sessions
pub async fn delete_collector(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deactivated = state.auth_service.deactivate_collector(id).await?;
    if !deactivated {
        return Err(ApiError::NotFound("Collector not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
