//! Collector administration routes (admin only)

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::collectors;
use crate::state::AppState;

pub fn collector_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collectors",
            post(collectors::create_collector).get(collectors::list_collectors),
        )
        .route(
            "/collectors/:id",
            get(collectors::get_collector)
                .put(collectors::update_collector)
                .delete(collectors::delete_collector),
        )
}
