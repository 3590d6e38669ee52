//! Handlers for the `/cart` resource.
//!
//! Every mutation goes through [`ReservationProtocol`], so adding to the cart
//! reserves stock immediately and removing a line hands it back.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sweetshop_core::error::CoreError;
use sweetshop_core::types::{DbId, Quantity};
use sweetshop_db::models::cart::{CartResponse, Receipt};
use sweetshop_db::repositories::CartRepo;
use sweetshop_db::reservation::{ReservationProtocol, UpdateOutcome};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::query::NewQuantityParams;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

fn one() -> Quantity {
    1
}

/// Request body for `POST /cart/add`.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub sweet_id: DbId,
    #[serde(default = "one")]
    pub quantity: Quantity,
}

/// Stock movement caused by an add or a quantity change.
#[derive(Debug, Serialize)]
pub struct CartLineChange {
    pub message: &'static str,
    pub line_id: DbId,
    /// Quantity on the line afterwards; zero if it was removed.
    pub quantity: Quantity,
    pub remaining_stock: Quantity,
}

/// Response for `DELETE /cart/{line_id}`.
#[derive(Debug, Serialize)]
pub struct RemoveLineResponse {
    pub message: &'static str,
    pub sweet_id: DbId,
    pub released: Quantity,
    pub remaining_stock: Quantity,
}

/// Response for `DELETE /cart`.
#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub message: &'static str,
    pub lines_removed: u64,
    pub units_released: i64,
}

/// Response for `POST /cart/checkout`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub receipt: Receipt,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/cart/add
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<AddToCartRequest>,
) -> AppResult<Json<CartLineChange>> {
    let outcome =
        ReservationProtocol::add_to_cart(&state.pool, user.user_id, input.sweet_id, input.quantity)
            .await?;
    Ok(Json(CartLineChange {
        message: "Added to cart",
        line_id: outcome.line_id,
        quantity: outcome.quantity,
        remaining_stock: outcome.remaining_stock,
    }))
}

/// GET /api/cart
pub async fn get_cart(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<CartResponse>> {
    let lines = CartRepo::lines_for(&state.pool, user.user_id).await?;
    Ok(Json(CartResponse::from(lines)))
}

/// PUT /api/cart/{line_id}/quantity?new_quantity=
pub async fn update_quantity(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(line_id): Path<DbId>,
    Query(params): Query<NewQuantityParams>,
) -> AppResult<Json<CartLineChange>> {
    let new_quantity = params
        .new_quantity
        .ok_or_else(|| AppError::BadRequest("new_quantity query parameter is required".into()))?;

    let outcome =
        ReservationProtocol::update_line(&state.pool, user.user_id, line_id, new_quantity).await?;
    let response = match outcome {
        UpdateOutcome::Updated {
            quantity,
            remaining_stock,
        } => CartLineChange {
            message: "Quantity updated",
            line_id,
            quantity,
            remaining_stock,
        },
        UpdateOutcome::Removed { remaining_stock } => CartLineChange {
            message: "Item removed from cart",
            line_id,
            quantity: 0,
            remaining_stock,
        },
    };
    Ok(Json(response))
}

/// DELETE /api/cart/{line_id}
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(line_id): Path<DbId>,
) -> AppResult<Json<RemoveLineResponse>> {
    let released = ReservationProtocol::remove_line(&state.pool, user.user_id, line_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Cart item",
            id: line_id,
        }))?;
    Ok(Json(RemoveLineResponse {
        message: "Removed from cart",
        sweet_id: released.sweet_id,
        released: released.released,
        remaining_stock: released.remaining_stock,
    }))
}

/// DELETE /api/cart
pub async fn clear(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<ClearCartResponse>> {
    let outcome = ReservationProtocol::clear_cart(&state.pool, user.user_id).await?;
    Ok(Json(ClearCartResponse {
        message: "Cart cleared",
        lines_removed: outcome.lines_removed,
        units_released: outcome.units_released,
    }))
}

/// POST /api/cart/checkout
pub async fn checkout(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<CheckoutResponse>> {
    let receipt = ReservationProtocol::checkout(&state.pool, user.user_id).await?;
    Ok(Json(CheckoutResponse {
        message: "Purchase successful",
        receipt,
    }))
}
