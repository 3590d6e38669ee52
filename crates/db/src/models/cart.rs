//! Cart line model, cart view, and checkout receipt.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use sweetshop_core::pricing;
use sweetshop_core::types::{DbId, Quantity, Timestamp};

/// A row from the `cart_items` table: `quantity` units of one sweet reserved
/// by one user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartItem {
    pub id: DbId,
    pub user_id: DbId,
    pub sweet_id: DbId,
    pub quantity: Quantity,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A cart line joined with the sweet it reserves.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub id: DbId,
    pub sweet_id: DbId,
    pub sweet_name: String,
    pub sweet_price: Decimal,
    pub quantity: Quantity,
}

/// One line of `GET /cart`.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineResponse {
    pub id: DbId,
    pub sweet_id: DbId,
    pub sweet_name: String,
    pub sweet_price: Decimal,
    pub quantity: Quantity,
    pub line_total: Decimal,
}

/// The caller's cart with its computed total.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub total_price: Decimal,
}

impl From<Vec<CartLine>> for CartResponse {
    fn from(lines: Vec<CartLine>) -> Self {
        let total_price = pricing::cart_total(lines.iter().map(|l| (l.sweet_price, l.quantity)));
        let items = lines
            .into_iter()
            .map(|line| CartLineResponse {
                line_total: pricing::line_total(line.sweet_price, line.quantity),
                id: line.id,
                sweet_id: line.sweet_id,
                sweet_name: line.sweet_name,
                sweet_price: line.sweet_price,
                quantity: line.quantity,
            })
            .collect();
        Self { items, total_price }
    }
}

/// One purchased line, priced at checkout time.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub sweet_id: DbId,
    pub name: String,
    pub quantity: Quantity,
    pub price: Decimal,
    pub line_total: Decimal,
}

/// Checkout receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub items: Vec<ReceiptLine>,
    /// Number of distinct lines purchased.
    pub total_items: usize,
    /// Number of units purchased across all lines.
    pub total_units: i64,
    pub total_price: Decimal,
}

impl From<Vec<CartLine>> for Receipt {
    fn from(lines: Vec<CartLine>) -> Self {
        let items: Vec<ReceiptLine> = lines
            .into_iter()
            .map(|line| ReceiptLine {
                line_total: pricing::line_total(line.sweet_price, line.quantity),
                sweet_id: line.sweet_id,
                name: line.sweet_name,
                quantity: line.quantity,
                price: line.sweet_price,
            })
            .collect();
        Self {
            total_items: items.len(),
            total_units: items.iter().map(|i| i64::from(i.quantity)).sum(),
            total_price: items.iter().map(|i| i.line_total).sum(),
            items,
        }
    }
}
