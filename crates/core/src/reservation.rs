//! Stock reservation arithmetic.
//!
//! Every unit of a sweet's stock is either *available* (counted by the
//! ledger) or *reserved* by exactly one cart line. The planners here take a
//! snapshot of both counters, validate the requested change, and return the
//! ledger movement plus the resulting line quantity. They never touch
//! storage; the caller applies the plan inside a transaction that holds the
//! relevant row locks, so the snapshot cannot go stale between planning and
//! applying.

use crate::error::CoreError;
use crate::types::Quantity;

/// How the ledger's available quantity must change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    Unchanged,
    /// Take units out of the available pool.
    Debit(Quantity),
    /// Return units to the available pool.
    Credit(Quantity),
}

impl StockMovement {
    /// Available quantity after applying this movement to `available`, or
    /// `None` if the counter would leave the `Quantity` range.
    pub fn apply(self, available: Quantity) -> Option<Quantity> {
        match self {
            Self::Unchanged => Some(available),
            Self::Debit(n) => available.checked_sub(n),
            Self::Credit(n) => available.checked_add(n),
        }
    }

    fn apply_checked(self, available: Quantity) -> Result<Quantity, CoreError> {
        self.apply(available)
            .ok_or_else(|| CoreError::Validation("Stock counter would overflow".into()))
    }
}

/// The outcome of planning a change to one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePlan {
    pub movement: StockMovement,
    /// Reserved quantity of the line afterwards. `None` means the line must
    /// be deleted.
    pub line_quantity: Option<Quantity>,
    /// Ledger quantity afterwards.
    pub remaining_stock: Quantity,
}

/// Reject zero and negative quantities for operations that only make sense
/// with a positive count (add, purchase, restock).
pub fn require_positive(quantity: Quantity, what: &str) -> Result<(), CoreError> {
    if quantity <= 0 {
        return Err(CoreError::Validation(format!(
            "{what} must be greater than zero, got {quantity}"
        )));
    }
    Ok(())
}

/// Check that `available` units on the ledger plus `reserved` units held in
/// carts still fit in a single stock counter.
///
/// Every reserved unit can be credited back, so a ledger value that leaves no
/// room for them would make a later release impossible.
pub fn ensure_capacity(available: Quantity, reserved: i64) -> Result<(), CoreError> {
    if i64::from(available) + reserved > i64::from(Quantity::MAX) {
        return Err(CoreError::Validation(format!(
            "Stock of {available} plus {reserved} reserved units exceeds the maximum of {}",
            Quantity::MAX
        )));
    }
    Ok(())
}

fn ensure_available(available: Quantity, requested: Quantity) -> Result<(), CoreError> {
    if available < requested {
        return Err(CoreError::InsufficientStock {
            requested,
            available,
        });
    }
    Ok(())
}

/// Plan adding `quantity` units to a user's line for one sweet.
///
/// `reserved` is the line's current quantity, `0` when there is no line yet.
pub fn plan_add(
    available: Quantity,
    reserved: Quantity,
    quantity: Quantity,
) -> Result<LinePlan, CoreError> {
    require_positive(quantity, "Quantity")?;
    ensure_available(available, quantity)?;

    let line_quantity = reserved.checked_add(quantity).ok_or_else(|| {
        CoreError::Validation("Cart line quantity would overflow".into())
    })?;
    let movement = StockMovement::Debit(quantity);

    Ok(LinePlan {
        movement,
        line_quantity: Some(line_quantity),
        remaining_stock: movement.apply_checked(available)?,
    })
}

/// Plan setting a line to an absolute `new_quantity`.
///
/// Growing the line debits the difference and needs that much available
/// stock; shrinking it credits the difference back. A target of zero or
/// below deletes the line and returns everything it held.
pub fn plan_update(
    available: Quantity,
    reserved: Quantity,
    new_quantity: Quantity,
) -> Result<LinePlan, CoreError> {
    let target = new_quantity.max(0);
    let diff = target
        .checked_sub(reserved)
        .ok_or_else(|| CoreError::Validation("Cart line quantity would overflow".into()))?;
    let movement = match diff {
        0 => StockMovement::Unchanged,
        diff if diff > 0 => {
            ensure_available(available, diff)?;
            StockMovement::Debit(diff)
        }
        diff => StockMovement::Credit(-diff),
    };

    Ok(LinePlan {
        movement,
        line_quantity: (target > 0).then_some(target),
        remaining_stock: movement.apply_checked(available)?,
    })
}

/// Plan releasing a whole line back to the ledger.
pub fn plan_release(available: Quantity, reserved: Quantity) -> Result<LinePlan, CoreError> {
    let movement = if reserved > 0 {
        StockMovement::Credit(reserved)
    } else {
        StockMovement::Unchanged
    };
    Ok(LinePlan {
        movement,
        line_quantity: None,
        remaining_stock: movement.apply_checked(available)?,
    })
}

/// Plan a direct purchase: units leave the ledger without ever being
/// reserved. Returns the remaining stock.
pub fn plan_purchase(available: Quantity, quantity: Quantity) -> Result<Quantity, CoreError> {
    require_positive(quantity, "Purchase quantity")?;
    ensure_available(available, quantity)?;
    Ok(available - quantity)
}

/// Plan an admin restock. Returns the new stock.
///
/// `reserved` is the number of units of this sweet currently held in carts;
/// the new stock must leave room for all of them to be released.
pub fn plan_restock(
    available: Quantity,
    reserved: i64,
    quantity: Quantity,
) -> Result<Quantity, CoreError> {
    require_positive(quantity, "Restock quantity")?;
    let new_stock = available
        .checked_add(quantity)
        .ok_or_else(|| CoreError::Validation("Restock would overflow stock counter".into()))?;
    ensure_capacity(new_stock, reserved)?;
    Ok(new_stock)
}
