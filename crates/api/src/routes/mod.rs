pub mod auth;
pub mod cart;
pub mod health;
pub mod sweets;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                          register (public)
/// /auth/login                             login (public)
///
/// /sweets                                 list (?search=), create (admin)
/// /sweets/search                          filtered list
/// /sweets/{id}                            get, update (admin), delete (admin)
/// /sweets/{id}/purchase                   direct purchase (?quantity=)
/// /sweets/{id}/restock                    restock (admin, ?quantity=)
///
/// /cart                                   view, clear
/// /cart/add                               reserve stock in the cart
/// /cart/checkout                          turn reservations into a sale
/// /cart/{line_id}                         remove line
/// /cart/{line_id}/quantity                set line quantity (?new_quantity=)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sweets", sweets::router())
        .nest("/cart", cart::router())
}
