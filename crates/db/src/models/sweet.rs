//! Sweet (catalog item) model and DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sweetshop_core::catalog;
use sweetshop_core::error::CoreError;
use sweetshop_core::types::{DbId, Quantity, Timestamp};

/// A row from the `sweets` table.
///
/// `quantity` is the ledger's available count; units held in carts are not
/// included.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sweet {
    pub id: DbId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: Quantity,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a sweet.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSweet {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Quantity,
}

impl CreateSweet {
    pub fn validate(&self) -> Result<(), CoreError> {
        catalog::validate_label("name", &self.name)?;
        catalog::validate_label("category", &self.category)?;
        catalog::validate_price(self.price)?;
        catalog::validate_stock(self.quantity)
    }
}

/// DTO for a partial update. `quantity` overwrites the *available* count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSweet {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<Quantity>,
}

impl UpdateSweet {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            catalog::validate_label("name", name)?;
        }
        if let Some(category) = &self.category {
            catalog::validate_label("category", category)?;
        }
        if let Some(price) = self.price {
            catalog::validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            catalog::validate_stock(quantity)?;
        }
        Ok(())
    }
}

/// Catalog filter. Every field is optional; absent fields do not filter.
///
/// `text` matches either name or category (the `?search=` parameter of the
/// list endpoint); `name` and `category` match their own column only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweetFilter {
    pub text: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl SweetFilter {
    pub fn validate(&self) -> Result<(), CoreError> {
        catalog::validate_price_range(self.min_price, self.max_price)
    }
}
