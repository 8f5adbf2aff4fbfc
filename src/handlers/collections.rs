//! Collection (payment) HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AuthenticatedUser};
use crate::error::ApiError;
use crate::models::{
    CollectionDetail, CollectionListQuery, CreateCollectionRequest, PaginatedResponse,
    UpdateCollectionRequest,
};
use crate::state::AppState;

/// POST /api/collections - Record a payment against an installment
pub async fn create_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<CollectionDetail>), ApiError> {
    req.validate()?;

    let collection = state.collection_service.record_payment(req).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/collections - Filtered, paginated, newest first
pub async fn list_collections(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<CollectionListQuery>,
) -> Result<Json<PaginatedResponse<CollectionDetail>>, ApiError> {
    let collections = state.collection_service.list_collections(query).await?;
    Ok(Json(collections))
}

/// GET /api/collections/:id
pub async fn get_collection(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CollectionDetail>, ApiError> {
    let collection = state
        .collection_service
        .get_collection(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    Ok(Json(collection))
}

/// PUT /api/collections/:id - Admin edit; re-derives installment state
pub async fn update_collection(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCollectionRequest>,
) -> Result<Json<CollectionDetail>, ApiError> {
    req.validate()?;

    let collection = state
        .collection_service
        .update_collection(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    Ok(Json(collection))
}

/// DELETE /api/collections/:id - Admin delete; re-derives installment state
pub async fn delete_collection(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.collection_service.delete_collection(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Collection not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
