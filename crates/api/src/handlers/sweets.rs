//! Handlers for the `/sweets` resource: catalog reads, admin CRUD, direct
//! purchase and restock.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sweetshop_core::error::CoreError;
use sweetshop_core::types::{DbId, Quantity};
use sweetshop_db::models::sweet::{CreateSweet, Sweet, SweetFilter, UpdateSweet};
use sweetshop_db::repositories::SweetRepo;
use sweetshop_db::reservation::ReservationProtocol;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::{QuantityParams, SearchParams};
use crate::state::AppState;

/// Response for `DELETE /sweets/{id}`.
#[derive(Debug, Serialize)]
pub struct DeleteSweetResponse {
    pub message: &'static str,
    /// Cart lines dropped together with the sweet.
    pub released_lines: i64,
    pub released_units: i64,
}

/// Response for `POST /sweets/{id}/purchase`.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub message: &'static str,
    pub remaining_quantity: Quantity,
}

/// Response for `POST /sweets/{id}/restock`.
#[derive(Debug, Serialize)]
pub struct RestockResponse {
    pub message: &'static str,
    pub new_quantity: Quantity,
}

/// GET /api/sweets?search=
///
/// `search` matches name or category, case-insensitively.
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Sweet>>> {
    let filter = SweetFilter {
        text: params.search,
        ..Default::default()
    };
    let sweets = SweetRepo::search(&state.pool, &filter).await?;
    Ok(Json(sweets))
}

/// GET /api/sweets/search?name=&category=&min_price=&max_price=
pub async fn search(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(filter): Query<SweetFilter>,
) -> AppResult<Json<Vec<Sweet>>> {
    filter.validate()?;
    let sweets = SweetRepo::search(&state.pool, &filter).await?;
    Ok(Json(sweets))
}

/// GET /api/sweets/{id}
pub async fn get_by_id(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Sweet>> {
    let sweet = SweetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Sweet",
            id,
        }))?;
    Ok(Json(sweet))
}

/// POST /api/sweets
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateSweet>,
) -> AppResult<(StatusCode, Json<Sweet>)> {
    input.validate()?;
    let sweet = SweetRepo::create(&state.pool, &input).await?;
    tracing::info!(
        admin_id = admin.user_id,
        sweet_id = sweet.id,
        name = %sweet.name,
        quantity = sweet.quantity,
        "Created sweet"
    );
    Ok((StatusCode::CREATED, Json(sweet)))
}

/// PUT /api/sweets/{id}
///
/// Partial update. A `quantity` overwrites available stock; units already
/// reserved in carts are unaffected.
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSweet>,
) -> AppResult<Json<Sweet>> {
    let sweet = ReservationProtocol::update_sweet(&state.pool, id, &input).await?;
    tracing::info!(admin_id = admin.user_id, sweet_id = id, "Updated sweet");
    Ok(Json(sweet))
}

/// DELETE /api/sweets/{id}
///
/// Cart lines reserving the sweet are deleted with it.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DeleteSweetResponse>> {
    let outcome = ReservationProtocol::delete_sweet(&state.pool, id).await?;
    tracing::info!(admin_id = admin.user_id, sweet_id = id, "Deleted sweet");
    Ok(Json(DeleteSweetResponse {
        message: "Sweet deleted",
        released_lines: outcome.released_lines,
        released_units: outcome.released_units,
    }))
}

/// POST /api/sweets/{id}/purchase?quantity=
///
/// Buy straight from stock without going through the cart. One unit when
/// `quantity` is omitted.
pub async fn purchase(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<QuantityParams>,
) -> AppResult<Json<PurchaseResponse>> {
    let quantity = params.quantity.unwrap_or(1);
    let remaining_quantity = ReservationProtocol::purchase(&state.pool, id, quantity).await?;
    tracing::debug!(user_id = user.user_id, sweet_id = id, quantity, "Purchase request served");
    Ok(Json(PurchaseResponse {
        message: "Purchase successful",
        remaining_quantity,
    }))
}

/// POST /api/sweets/{id}/restock?quantity=
pub async fn restock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<QuantityParams>,
) -> AppResult<Json<RestockResponse>> {
    let quantity = params
        .quantity
        .ok_or_else(|| AppError::BadRequest("quantity query parameter is required".into()))?;
    let new_quantity = ReservationProtocol::restock(&state.pool, id, quantity).await?;
    tracing::debug!(admin_id = admin.user_id, sweet_id = id, quantity, "Restock request served");
    Ok(Json(RestockResponse {
        message: "Restocked successfully",
        new_quantity,
    }))
}
