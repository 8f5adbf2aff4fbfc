//! Loan lifecycle HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    CreateLoanRequest, Installment, Loan, LoanDetail, LoanListItem, LoanPayment,
    PaginatedResponse, PaginationParams, UpdateLoanRequest,
};
use crate::state::AppState;

/// Response body for a newly issued loan
#[derive(Debug, Serialize)]
pub struct IssueLoanResponse {
    #[serde(flatten)]
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

/// POST /api/loans - Issue a loan with its installment schedule
pub async fn create_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<IssueLoanResponse>), ApiError> {
    req.validate()?;

    let (loan, installments) = state.loan_service.issue_loan(req, user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueLoanResponse { loan, installments }),
    ))
}

/// GET /api/loans - List with computed repayment totals
pub async fn list_loans(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<LoanListItem>>, ApiError> {
    let loans = state.loan_service.list_loans(params).await?;
    Ok(Json(loans))
}

/// GET /api/loans/:id - Loan with borrower and schedule
pub async fn get_loan(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LoanDetail>, ApiError> {
    let loan = state
        .loan_service
        .get_loan_detail(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

    Ok(Json(loan))
}

/// PUT /api/loans/:id - Partial update
pub async fn update_loan(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLoanRequest>,
) -> Result<Json<Loan>, ApiError> {
    req.validate()?;

    let loan = state
        .loan_service
        .update_loan(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

    Ok(Json(loan))
}

/// DELETE /api/loans/:id - Cascade delete of schedule
pub async fn delete_loan(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.loan_service.delete_loan(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Loan not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/loans/:id/payments - Payment history, newest first
pub async fn loan_payments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LoanPayment>>, ApiError> {
    let payments = state
        .loan_service
        .loan_payments(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan not found".to_string()))?;

    Ok(Json(payments))
}
