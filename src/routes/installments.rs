//! Installment view routes

use axum::{routing::get, Router};

use crate::handlers::installments;
use crate::state::AppState;

pub fn installment_routes() -> Router<AppState> {
    Router::new()
        .route("/installments", get(installments::list_installments))
        .route("/installments/:id", get(installments::get_installment))
}
