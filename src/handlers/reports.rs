//! Dashboard and backup HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AdminUser, StaffUser};
use crate::error::ApiError;
use crate::models::{DailySummary, DashboardStats};
use crate::ports::{BackupOutcome, BackupStatus};
use crate::state::AppState;

/// GET /api/dashboard/stats - Aggregate dashboard snapshot
pub async fn dashboard_stats(
    State(state): State<AppState>,
    StaffUser(_user): StaffUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = state.report_service.dashboard_stats().await?;
    Ok(Json(stats))
}

/// Request body for triggering a daily backup
#[derive(Debug, Deserialize)]
pub struct DailyBackupRequest {
    /// Calendar day to back up, `YYYY-MM-DD`; defaults to today (UTC)
    pub date: Option<String>,
}

/// Summary plus backup outcome returned by the backup trigger
#[derive(Debug, Serialize)]
pub struct DailyBackupResponse {
    pub summary: DailySummary,
    pub backup: BackupOutcome,
}

/// POST /api/backup/daily - Build the daily summary and push it to the
/// spreadsheet backup
pub async fn run_daily_backup(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(req): Json<DailyBackupRequest>,
) -> Result<Json<DailyBackupResponse>, ApiError> {
    let date = parse_date(req.date.as_deref())?;

    let summary = state.report_service.daily_summary(date).await?;
    let backup = state.sheet_backup.backup_daily_summary(&summary).await?;

    Ok(Json(DailyBackupResponse { summary, backup }))
}

/// Query for checking backup status
#[derive(Debug, Deserialize)]
pub struct BackupStatusQuery {
    pub date: Option<String>,
}

/// GET /api/backup/daily - Backup status for a date
pub async fn backup_status(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Query(query): Query<BackupStatusQuery>,
) -> Result<Json<BackupStatus>, ApiError> {
    let date = parse_date(query.date.as_deref())?;
    let status = state
        .sheet_backup
        .status(&date.format("%Y-%m-%d").to_string())
        .await?;

    Ok(Json(status))
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("Invalid date: {}", s))),
        None => Ok(Utc::now().date_naive()),
    }
}
