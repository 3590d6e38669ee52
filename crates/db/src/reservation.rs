//! Stock-reservation protocol.
//!
//! Coordinates the inventory ledger (`sweets.quantity`) and the cart store
//! (`cart_items`) so that every unit of stock is either available or held by
//! exactly one cart line. Each public operation is one transaction:
//!
//! 1. lock the caller's `users` row (cart operations only),
//! 2. lock the touched `sweets` rows in ascending id order,
//! 3. read the cart lines, now stable under those locks,
//! 4. plan the change with [`sweetshop_core::reservation`],
//! 5. apply ledger and cart writes, commit.
//!
//! Any error before commit drops the transaction, which rolls it back, so a
//! failed operation leaves both stores exactly as they were. Serialization
//! failures and deadlocks are retried once before surfacing as
//! [`CoreError::Conflict`].

use std::future::Future;

use sqlx::{PgConnection, PgPool};
use sweetshop_core::error::CoreError;
use sweetshop_core::reservation::{self, StockMovement};
use sweetshop_core::types::{DbId, Quantity};

use crate::models::cart::Receipt;
use crate::models::sweet::{Sweet, UpdateSweet};
use crate::repositories::{CartRepo, LedgerRepo, SweetRepo, UserRepo};

/// Attempts per operation: the first try plus one retry.
const MAX_ATTEMPTS: u32 = 2;

/// PostgreSQL SQLSTATE codes for transient transaction conflicts.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ReservationError {
    /// Whether re-running the whole transaction could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db_err)) => matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;

/// Result of adding to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub line_id: DbId,
    /// Line quantity after the add.
    pub quantity: Quantity,
    pub remaining_stock: Quantity,
}

/// Result of setting a line to a new quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated {
        quantity: Quantity,
        remaining_stock: Quantity,
    },
    /// The target was zero or below; the line is gone and its stock returned.
    Removed { remaining_stock: Quantity },
}

/// A line whose reservation went back to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedLine {
    pub line_id: DbId,
    pub sweet_id: DbId,
    pub released: Quantity,
    pub remaining_stock: Quantity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub lines_removed: u64,
    pub units_released: i64,
}

/// Reservations dropped together with a deleted sweet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub released_lines: i64,
    pub released_units: i64,
}

/// Entry point for every operation that moves stock.
pub struct ReservationProtocol;

impl ReservationProtocol {
    /// Reserve `quantity` units of a sweet in the user's cart.
    pub async fn add_to_cart(
        pool: &PgPool,
        user_id: DbId,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<AddOutcome> {
        reservation::require_positive(quantity, "Quantity")?;
        with_retry("add_to_cart", || {
            Self::add_to_cart_once(pool, user_id, sweet_id, quantity)
        })
        .await
    }

    /// Set one of the user's lines to `new_quantity`, debiting or crediting
    /// the difference. Zero or below removes the line.
    pub async fn update_line(
        pool: &PgPool,
        user_id: DbId,
        line_id: DbId,
        new_quantity: Quantity,
    ) -> ReservationResult<UpdateOutcome> {
        with_retry("update_line", || {
            Self::update_line_once(pool, user_id, line_id, new_quantity)
        })
        .await
    }

    /// Release one of the user's lines by line id.
    ///
    /// Returns `None`, with no state change, if the user holds no such line.
    pub async fn remove_line(
        pool: &PgPool,
        user_id: DbId,
        line_id: DbId,
    ) -> ReservationResult<Option<ReleasedLine>> {
        with_retry("remove_line", || Self::remove_line_once(pool, user_id, line_id)).await
    }

    /// Release the user's line for `sweet_id`, if any. A no-op when absent.
    pub async fn remove_sweet(
        pool: &PgPool,
        user_id: DbId,
        sweet_id: DbId,
    ) -> ReservationResult<Option<ReleasedLine>> {
        with_retry("remove_sweet", || Self::remove_sweet_once(pool, user_id, sweet_id)).await
    }

    /// Empty the user's cart, returning every reserved unit to the ledger.
    pub async fn clear_cart(pool: &PgPool, user_id: DbId) -> ReservationResult<ClearOutcome> {
        with_retry("clear_cart", || Self::clear_cart_once(pool, user_id)).await
    }

    /// Turn every reservation in the user's cart into a sale.
    ///
    /// Reserved units were debited at add time and are not returned; the
    /// ledger is untouched. Prices are read under lock so the receipt
    /// reflects the catalog at the moment of checkout.
    pub async fn checkout(pool: &PgPool, user_id: DbId) -> ReservationResult<Receipt> {
        with_retry("checkout", || Self::checkout_once(pool, user_id)).await
    }

    /// Sell `quantity` units straight from the ledger, bypassing the cart.
    /// Returns the remaining stock.
    pub async fn purchase(
        pool: &PgPool,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<Quantity> {
        reservation::require_positive(quantity, "Purchase quantity")?;
        with_retry("purchase", || Self::purchase_once(pool, sweet_id, quantity)).await
    }

    /// Add `quantity` units to available stock. Returns the new stock.
    pub async fn restock(
        pool: &PgPool,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<Quantity> {
        reservation::require_positive(quantity, "Restock quantity")?;
        with_retry("restock", || Self::restock_once(pool, sweet_id, quantity)).await
    }

    /// Admin partial update of a sweet.
    ///
    /// A `quantity` overwrites *available* stock and leaves reservations
    /// alone.
    pub async fn update_sweet(
        pool: &PgPool,
        sweet_id: DbId,
        input: &UpdateSweet,
    ) -> ReservationResult<Sweet> {
        input.validate()?;
        with_retry("update_sweet", || Self::update_sweet_once(pool, sweet_id, input)).await
    }

    /// Delete a sweet together with every cart line that reserves it.
    pub async fn delete_sweet(pool: &PgPool, sweet_id: DbId) -> ReservationResult<DeleteOutcome> {
        with_retry("delete_sweet", || Self::delete_sweet_once(pool, sweet_id)).await
    }

    // -- Transaction bodies. Each runs one attempt; an early return drops
    // -- the transaction and rolls it back.

    async fn add_to_cart_once(
        pool: &PgPool,
        user_id: DbId,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<AddOutcome> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let sweet = lock_sweet(&mut tx, sweet_id).await?;

        let reserved = CartRepo::find_for_sweet(&mut *tx, user_id, sweet_id)
            .await?
            .map_or(0, |line| line.quantity);
        let plan = reservation::plan_add(sweet.quantity, reserved, quantity)?;

        let remaining_stock =
            apply_movement(&mut tx, &sweet, plan.movement, plan.remaining_stock).await?;
        let line = CartRepo::upsert_line(&mut tx, user_id, sweet_id, quantity).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            sweet_id,
            quantity,
            line_quantity = line.quantity,
            remaining_stock,
            "Reserved stock in cart"
        );
        Ok(AddOutcome {
            line_id: line.id,
            quantity: line.quantity,
            remaining_stock,
        })
    }

    async fn update_line_once(
        pool: &PgPool,
        user_id: DbId,
        line_id: DbId,
        new_quantity: Quantity,
    ) -> ReservationResult<UpdateOutcome> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let line = CartRepo::find_owned(&mut *tx, user_id, line_id)
            .await?
            .ok_or_else(|| line_not_found(line_id))?;
        // A concurrent delete of the sweet takes the line with it.
        let sweet = LedgerRepo::lock(&mut tx, line.sweet_id)
            .await?
            .ok_or_else(|| line_not_found(line_id))?;

        let plan = reservation::plan_update(sweet.quantity, line.quantity, new_quantity)?;
        let remaining_stock =
            apply_movement(&mut tx, &sweet, plan.movement, plan.remaining_stock).await?;

        let outcome = match plan.line_quantity {
            Some(quantity) => {
                CartRepo::set_line(&mut tx, user_id, sweet.id, quantity)
                    .await?
                    .ok_or_else(|| line_not_found(line_id))?;
                UpdateOutcome::Updated {
                    quantity,
                    remaining_stock,
                }
            }
            None => {
                CartRepo::remove_line(&mut tx, user_id, sweet.id).await?;
                UpdateOutcome::Removed { remaining_stock }
            }
        };
        tx.commit().await?;

        tracing::info!(
            user_id,
            line_id,
            sweet_id = sweet.id,
            from = line.quantity,
            to = new_quantity,
            remaining_stock,
            "Updated cart line"
        );
        Ok(outcome)
    }

    async fn remove_line_once(
        pool: &PgPool,
        user_id: DbId,
        line_id: DbId,
    ) -> ReservationResult<Option<ReleasedLine>> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let Some(line) = CartRepo::find_owned(&mut *tx, user_id, line_id).await? else {
            return Ok(None);
        };
        let released = release(&mut tx, user_id, line.sweet_id).await?;
        tx.commit().await?;
        Ok(released)
    }

    async fn remove_sweet_once(
        pool: &PgPool,
        user_id: DbId,
        sweet_id: DbId,
    ) -> ReservationResult<Option<ReleasedLine>> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let released = release(&mut tx, user_id, sweet_id).await?;
        tx.commit().await?;
        Ok(released)
    }

    async fn clear_cart_once(pool: &PgPool, user_id: DbId) -> ReservationResult<ClearOutcome> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let sweet_ids = CartRepo::sweet_ids_for(&mut tx, user_id).await?;
        let sweets = LedgerRepo::lock_many(&mut tx, &sweet_ids).await?;
        let lines = CartRepo::lines_for(&mut *tx, user_id).await?;

        let mut outcome = ClearOutcome::default();
        for line in &lines {
            // Lines cascade with their sweet, so every line has a locked row.
            let Some(sweet) = sweets.iter().find(|s| s.id == line.sweet_id) else {
                continue;
            };
            let plan = reservation::plan_release(sweet.quantity, line.quantity)?;
            apply_movement(&mut tx, sweet, plan.movement, plan.remaining_stock).await?;
            outcome.units_released += i64::from(line.quantity);
        }
        outcome.lines_removed = CartRepo::clear(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            lines_removed = outcome.lines_removed,
            units_released = outcome.units_released,
            "Cleared cart"
        );
        Ok(outcome)
    }

    async fn checkout_once(pool: &PgPool, user_id: DbId) -> ReservationResult<Receipt> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;
        let sweet_ids = CartRepo::sweet_ids_for(&mut tx, user_id).await?;
        if sweet_ids.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        LedgerRepo::lock_many(&mut tx, &sweet_ids).await?;
        let lines = CartRepo::lines_for(&mut *tx, user_id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let receipt = Receipt::from(lines);
        CartRepo::clear(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            total_items = receipt.total_items,
            total_units = receipt.total_units,
            total_price = %receipt.total_price,
            "Checked out cart"
        );
        Ok(receipt)
    }

    async fn purchase_once(
        pool: &PgPool,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<Quantity> {
        let mut tx = pool.begin().await?;
        let sweet = lock_sweet(&mut tx, sweet_id).await?;
        let planned = reservation::plan_purchase(sweet.quantity, quantity)?;
        let remaining =
            apply_movement(&mut tx, &sweet, StockMovement::Debit(quantity), planned).await?;
        tx.commit().await?;

        tracing::info!(sweet_id, quantity, remaining, "Direct purchase");
        Ok(remaining)
    }

    async fn restock_once(
        pool: &PgPool,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> ReservationResult<Quantity> {
        let mut tx = pool.begin().await?;
        let sweet = lock_sweet(&mut tx, sweet_id).await?;
        let (_, reserved) = CartRepo::reservations_for_sweet(&mut *tx, sweet_id).await?;
        let planned = reservation::plan_restock(sweet.quantity, reserved, quantity)?;
        let new_quantity =
            apply_movement(&mut tx, &sweet, StockMovement::Credit(quantity), planned).await?;
        tx.commit().await?;

        tracing::info!(sweet_id, quantity, new_quantity, "Restocked");
        Ok(new_quantity)
    }

    async fn update_sweet_once(
        pool: &PgPool,
        sweet_id: DbId,
        input: &UpdateSweet,
    ) -> ReservationResult<Sweet> {
        let mut tx = pool.begin().await?;
        let sweet = lock_sweet(&mut tx, sweet_id).await?;

        if let Some(quantity) = input.quantity {
            let (lines, units) = CartRepo::reservations_for_sweet(&mut *tx, sweet_id).await?;
            reservation::ensure_capacity(quantity, units)?;
            if lines > 0 {
                tracing::warn!(
                    sweet_id,
                    previous = sweet.quantity,
                    quantity,
                    reserved_lines = lines,
                    reserved_units = units,
                    "Overwriting available stock while reservations are outstanding"
                );
            }
            LedgerRepo::set_absolute(&mut tx, sweet_id, quantity)
                .await?
                .ok_or_else(|| sweet_not_found(sweet_id))?;
        }

        let updated = SweetRepo::update(&mut *tx, sweet_id, input)
            .await?
            .ok_or_else(|| sweet_not_found(sweet_id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_sweet_once(pool: &PgPool, sweet_id: DbId) -> ReservationResult<DeleteOutcome> {
        let mut tx = pool.begin().await?;
        lock_sweet(&mut tx, sweet_id).await?;
        let (released_lines, released_units) =
            CartRepo::reservations_for_sweet(&mut *tx, sweet_id).await?;
        if !SweetRepo::delete(&mut *tx, sweet_id).await? {
            return Err(sweet_not_found(sweet_id).into());
        }
        tx.commit().await?;

        tracing::info!(
            sweet_id,
            released_lines,
            released_units,
            "Deleted sweet and dropped its reservations"
        );
        Ok(DeleteOutcome {
            released_lines,
            released_units,
        })
    }
}

/// Run `attempt` and re-run it once if the store reports a transient
/// conflict.
async fn with_retry<T, F, Fut>(operation: &'static str, mut attempt: F) -> ReservationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ReservationResult<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(err) if err.is_retryable() => {
                if tries >= MAX_ATTEMPTS {
                    tracing::warn!(operation, error = %err, "Store conflict persisted, giving up");
                    return Err(CoreError::Conflict(format!(
                        "{operation} conflicted with a concurrent update; retry the request"
                    ))
                    .into());
                }
                tracing::warn!(operation, attempt = tries, error = %err, "Store conflict, retrying");
            }
            other => return other,
        }
    }
}

async fn lock_user(conn: &mut PgConnection, user_id: DbId) -> ReservationResult<()> {
    if UserRepo::lock(conn, user_id).await? {
        Ok(())
    } else {
        Err(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }
        .into())
    }
}

async fn lock_sweet(conn: &mut PgConnection, sweet_id: DbId) -> ReservationResult<Sweet> {
    LedgerRepo::lock(conn, sweet_id)
        .await?
        .ok_or_else(|| sweet_not_found(sweet_id).into())
}

/// Apply a planned movement to a locked sweet and return the new stock.
///
/// `planned` is the stock the planner computed from the locked snapshot; the
/// ledger must land on exactly that value.
async fn apply_movement(
    conn: &mut PgConnection,
    sweet: &Sweet,
    movement: StockMovement,
    planned: Quantity,
) -> ReservationResult<Quantity> {
    let stock = match movement {
        StockMovement::Unchanged => sweet.quantity,
        StockMovement::Debit(n) => LedgerRepo::debit(conn, sweet.id, n).await?.ok_or(
            CoreError::InsufficientStock {
                requested: n,
                available: sweet.quantity,
            },
        )?,
        StockMovement::Credit(n) => LedgerRepo::credit(conn, sweet.id, n)
            .await?
            .ok_or_else(|| sweet_not_found(sweet.id))?,
    };
    if stock != planned {
        tracing::error!(
            sweet_id = sweet.id,
            planned,
            stock,
            "Ledger diverged from planned stock"
        );
        return Err(CoreError::Internal(format!(
            "Stock for sweet {} is {stock}, expected {planned}",
            sweet.id
        ))
        .into());
    }
    Ok(stock)
}

/// Credit a line's reservation back and delete it. `None` if there is no
/// line (or its sweet has just been deleted, taking the line along).
async fn release(
    conn: &mut PgConnection,
    user_id: DbId,
    sweet_id: DbId,
) -> ReservationResult<Option<ReleasedLine>> {
    let Some(sweet) = LedgerRepo::lock(conn, sweet_id).await? else {
        return Ok(None);
    };
    let Some(line) = CartRepo::find_for_sweet(&mut *conn, user_id, sweet_id).await? else {
        return Ok(None);
    };

    let plan = reservation::plan_release(sweet.quantity, line.quantity)?;
    let remaining_stock =
        apply_movement(conn, &sweet, plan.movement, plan.remaining_stock).await?;
    CartRepo::remove_line(conn, user_id, sweet_id).await?;

    tracing::info!(
        user_id,
        line_id = line.id,
        sweet_id,
        released = line.quantity,
        remaining_stock,
        "Released cart line"
    );
    Ok(Some(ReleasedLine {
        line_id: line.id,
        sweet_id,
        released: line.quantity,
        remaining_stock,
    }))
}

fn sweet_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Sweet",
        id,
    }
}

fn line_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Cart item",
        id,
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use assert_matches::assert_matches;
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// A server-side error carrying only a SQLSTATE code.
    #[derive(Debug)]
    struct SqlState(&'static str);

    impl fmt::Display for SqlState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl StdError for SqlState {}

    impl DatabaseError for SqlState {
        fn message(&self) -> &str {
            "simulated server error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn store_error(code: &'static str) -> ReservationError {
        ReservationError::Database(sqlx::Error::Database(Box::new(SqlState(code))))
    }

    #[test]
    fn test_transient_conflicts_are_retryable() {
        assert!(store_error(SERIALIZATION_FAILURE).is_retryable());
        assert!(store_error(DEADLOCK_DETECTED).is_retryable());
        assert!(!store_error("23505").is_retryable());
        assert!(!ReservationError::Database(sqlx::Error::RowNotFound).is_retryable());
        assert!(!ReservationError::Core(CoreError::EmptyCart).is_retryable());
    }

    #[tokio::test]
    async fn test_conflict_is_retried_once() {
        let mut calls = 0;
        let result = with_retry("add_to_cart", || {
            calls += 1;
            let call = calls;
            async move {
                if call == 1 {
                    Err(store_error(SERIALIZATION_FAILURE))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces_as_conflict() {
        let mut calls = 0;
        let result: ReservationResult<()> = with_retry("checkout", || {
            calls += 1;
            async { Err(store_error(DEADLOCK_DETECTED)) }
        })
        .await;

        assert_matches!(result, Err(ReservationError::Core(CoreError::Conflict(_))));
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let mut calls = 0;
        let result: ReservationResult<()> = with_retry("checkout", || {
            calls += 1;
            async { Err(CoreError::EmptyCart.into()) }
        })
        .await;

        assert_matches!(result, Err(ReservationError::Core(CoreError::EmptyCart)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_other_store_errors_are_not_retried() {
        let mut calls = 0;
        let result: ReservationResult<()> = with_retry("purchase", || {
            calls += 1;
            async { Err(store_error("23514")) }
        })
        .await;

        assert_matches!(result, Err(ReservationError::Database(_)));
        assert_eq!(calls, 1);
    }
}
