//! Route definitions for the `/cart` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::cart;
use crate::state::AppState;

/// Routes mounted at `/cart`.
///
/// ```text
/// GET    /                      -> get_cart
/// DELETE /                      -> clear
/// POST   /add                   -> add
/// POST   /checkout              -> checkout
/// DELETE /{line_id}             -> remove
/// PUT    /{line_id}/quantity    -> update_quantity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get_cart).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/checkout", post(cart::checkout))
        .route("/{line_id}", delete(cart::remove))
        .route("/{line_id}/quantity", put(cart::update_quantity))
}
