//! Shared query parameter types for API handlers.

use serde::Deserialize;
use sweetshop_core::types::Quantity;

/// `?quantity=` for direct purchase and restock. Purchase defaults to one unit.
#[derive(Debug, Deserialize)]
pub struct QuantityParams {
    pub quantity: Option<Quantity>,
}

/// `?new_quantity=` for setting a cart line's quantity. Required; zero or
/// below removes the line.
#[derive(Debug, Deserialize)]
pub struct NewQuantityParams {
    pub new_quantity: Option<Quantity>,
}

/// `?search=` for the catalog list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}
