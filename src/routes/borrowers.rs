//! Borrower registry routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::borrowers;
use crate::state::AppState;

pub fn borrower_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/borrowers",
            post(borrowers::create_borrower).get(borrowers::list_borrowers),
        )
        .route(
            "/borrowers/:id",
            get(borrowers::get_borrower)
                .put(borrowers::update_borrower)
                .delete(borrowers::delete_borrower),
        )
        .route("/borrowers/:id/summary", get(borrowers::borrower_summary))
        .route("/borrowers/:id/documents", post(borrowers::upload_document))
}
