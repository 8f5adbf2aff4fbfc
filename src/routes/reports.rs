//! Dashboard and backup routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::reports;
use crate::state::AppState;

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(reports::dashboard_stats))
        .route(
            "/backup/daily",
            post(reports::run_daily_backup).get(reports::backup_status),
        )
}
