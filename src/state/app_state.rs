//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::borrower_service::BorrowerService;
use crate::collection_service::CollectionService;
use crate::loan_service::LoanService;
use crate::ports::{AssetStoreService, SheetBackupService};
use crate::report_service::ReportService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub borrower_service: Arc<BorrowerService>,
    pub loan_service: Arc<LoanService>,
    pub collection_service: Arc<CollectionService>,
    pub report_service: Arc<ReportService>,
    pub sheet_backup: Arc<SheetBackupService>,
    pub asset_store: Arc<AssetStoreService>,
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<BorrowerService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.borrower_service.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<CollectionService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.collection_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReportService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.report_service.clone()
    }
}
