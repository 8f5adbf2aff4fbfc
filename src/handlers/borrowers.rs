//! Borrower registry HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{
    Borrower, BorrowerListQuery, BorrowerSummary, CreateBorrowerRequest, PaginatedResponse,
    UpdateBorrowerRequest,
};
use crate::state::AppState;

/// POST /api/borrowers - Register a borrower
pub async fn create_borrower(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(req): Json<CreateBorrowerRequest>,
) -> Result<(StatusCode, Json<Borrower>), ApiError> {
    req.validate()?;

    let borrower = state.borrower_service.create_borrower(req).await?;
    Ok((StatusCode::CREATED, Json(borrower)))
}

/// GET /api/borrowers - List with search and pagination
pub async fn list_borrowers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<BorrowerListQuery>,
) -> Result<Json<PaginatedResponse<Borrower>>, ApiError> {
    let borrowers = state.borrower_service.list_borrowers(query).await?;
    Ok(Json(borrowers))
}

/// GET /api/borrowers/:id
pub async fn get_borrower(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Borrower>, ApiError> {
    let borrower = state
        .borrower_service
        .get_borrower(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Borrower not found".to_string()))?;

    Ok(Json(borrower))
}

/// PUT /api/borrowers/:id - Partial update
pub async fn update_borrower(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBorrowerRequest>,
) -> Result<Json<Borrower>, ApiError> {
    req.validate()?;

    let borrower = state
        .borrower_service
        .update_borrower(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Borrower not found".to_string()))?;

    Ok(Json(borrower))
}

/// DELETE /api/borrowers/:id - Refused while the borrower has loans
pub async fn delete_borrower(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let summary = state
        .borrower_service
        .borrower_summary(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Borrower not found".to_string()))?;
    if summary.loan_count > 0 {
        return Err(ApiError::Conflict(
            "Borrower has loans on record and cannot be deleted".to_string(),
        ));
    }

    let deleted = state.borrower_service.delete_borrower(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Borrower not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/borrowers/:id/summary - Loan count and outstanding total
pub async fn borrower_summary(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BorrowerSummary>, ApiError> {
    let summary = state
        .borrower_service
        .borrower_summary(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Borrower not found".to_string()))?;

    Ok(Json(summary))
}

/// Request body for uploading a borrower document image
#[derive(Debug, Deserialize, Validate)]
pub struct UploadDocumentRequest {
    /// "photo" or "id_proof"
    pub kind: String,
    #[validate(length(min = 1, message = "Filename is required"))]
    pub filename: String,
    #[validate(length(min = 1, message = "Image data is required"))]
    pub data_base64: String,
}

/// Borrower field a document kind attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Photo,
    IdProof,
}

impl DocumentKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "photo" => Some(DocumentKind::Photo),
            "id_proof" => Some(DocumentKind::IdProof),
            _ => None,
        }
    }

    fn into_update(self, url: String) -> UpdateBorrowerRequest {
        match self {
            DocumentKind::Photo => UpdateBorrowerRequest {
                photo_url: Some(url),
                ..Default::default()
            },
            DocumentKind::IdProof => UpdateBorrowerRequest {
                id_proof_url: Some(url),
                ..Default::default()
            },
        }
    }
}

/// POST /api/borrowers/:id/documents - Store a photo or ID proof image
/// through the asset store and attach its URL to the borrower.
/// All input checks run before the upstream upload, so a rejected request
/// never leaves an orphaned asset behind.
pub async fn upload_document(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UploadDocumentRequest>,
) -> Result<Json<Borrower>, ApiError> {
    req.validate()?;

    let kind = DocumentKind::parse(&req.kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown document kind: {}", req.kind)))?;

    if base64::engine::general_purpose::STANDARD
        .decode(&req.data_base64)
        .is_err()
    {
        return Err(ApiError::BadRequest(
            "Image data is not valid base64".to_string(),
        ));
    }

    if state.borrower_service.get_borrower(id).await?.is_none() {
        return Err(ApiError::NotFound("Borrower not found".to_string()));
    }

    let url = state
        .asset_store
        .store(&req.kind, &req.filename, &req.data_base64)
        .await?;

    let borrower = state
        .borrower_service
        .update_borrower(id, kind.into_update(url))
        .await?
        .ok_or_else(|| ApiError::NotFound("Borrower not found".to_string()))?;

    Ok(Json(borrower))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_accepts_known_kinds() {
        assert_eq!(DocumentKind::parse("photo"), Some(DocumentKind::Photo));
        assert_eq!(DocumentKind::parse("id_proof"), Some(DocumentKind::IdProof));
    }

    #[test]
    fn test_unknown_document_kind_is_rejected_before_upload() {
        assert_eq!(DocumentKind::parse("selfie"), None);
        assert_eq!(DocumentKind::parse(""), None);
        assert_eq!(DocumentKind::parse("Photo"), None);
    }

    #[test]
    fn test_document_kind_maps_to_matching_field() {
        let update = DocumentKind::Photo.into_update("https://assets/x.jpg".to_string());
        assert_eq!(update.photo_url.as_deref(), Some("https://assets/x.jpg"));
        assert!(update.id_proof_url.is_none());

        let update = DocumentKind::IdProof.into_update("https://assets/y.jpg".to_string());
        assert_eq!(update.id_proof_url.as_deref(), Some("https://assets/y.jpg"));
        assert!(update.photo_url.is_none());
    }
}
