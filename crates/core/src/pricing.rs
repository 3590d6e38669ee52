//! Price arithmetic for cart views and checkout receipts.
//!
//! Prices are `Decimal` end to end so repeated add/remove cycles never
//! accumulate binary rounding error.

use rust_decimal::Decimal;

use crate::types::Quantity;

/// `price * quantity` for a single line.
pub fn line_total(price: Decimal, quantity: Quantity) -> Decimal {
    price * Decimal::from(quantity)
}

/// Sum of `price * quantity` over all lines.
pub fn cart_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Quantity)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .sum()
}
