//! Installment view HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{InstallmentDetail, InstallmentListQuery};
use crate::state::AppState;

/// GET /api/installments - Filter by status and loan, due date ascending
pub async fn list_installments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<InstallmentListQuery>,
) -> Result<Json<Vec<InstallmentDetail>>, ApiError> {
    let installments = state.loan_service.list_installments(query).await?;
    Ok(Json(installments))
}

/// GET /api/installments/:id
pub async fn get_installment(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InstallmentDetail>, ApiError> {
    let installment = state
        .loan_service
        .get_installment(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Installment not found".to_string()))?;

    Ok(Json(installment))
}
