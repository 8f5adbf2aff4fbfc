//! Collection (payment) routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::collections;
use crate::state::AppState;

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            post(collections::create_collection).get(collections::list_collections),
        )
        .route(
            "/collections/:id",
            get(collections::get_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
}
