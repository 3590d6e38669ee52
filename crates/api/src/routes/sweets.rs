//! Route definitions for the `/sweets` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sweets;
use crate::state::AppState;

/// Routes mounted at `/sweets`.
///
/// ```text
/// GET    /                -> list
/// POST   /                -> create
/// GET    /search          -> search
/// GET    /{id}            -> get_by_id
/// PUT    /{id}            -> update
/// DELETE /{id}            -> delete
/// POST   /{id}/purchase   -> purchase
/// POST   /{id}/restock    -> restock
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sweets::list).post(sweets::create))
        .route("/search", get(sweets::search))
        .route(
            "/{id}",
            get(sweets::get_by_id)
                .put(sweets::update)
                .delete(sweets::delete),
        )
        .route("/{id}/purchase", post(sweets::purchase))
        .route("/{id}/restock", post(sweets::restock))
}
