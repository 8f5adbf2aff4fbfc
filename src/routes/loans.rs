//! Loan lifecycle routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::loans;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", post(loans::create_loan).get(loans::list_loans))
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::update_loan)
                .delete(loans::delete_loan),
        )
        .route("/loans/:id/payments", get(loans::loan_payments))
}
