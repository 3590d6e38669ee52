//! Inventory ledger: the available-quantity counter on each `sweets` row.
//!
//! All methods run on a transaction connection. Callers lock the row with
//! [`LedgerRepo::lock`] (or [`LedgerRepo::lock_many`]) before planning a
//! movement, so the quantity they planned against is the quantity they
//! write against.

use sqlx::PgConnection;
use sweetshop_core::types::{DbId, Quantity};

use super::sweet_repo::COLUMNS;
use crate::models::sweet::Sweet;

pub struct LedgerRepo;

impl LedgerRepo {
    /// Lock one sweet row (`FOR UPDATE`) and return it. `None` if the sweet
    /// does not exist.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Option<Sweet>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sweets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Sweet>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock several sweet rows in ascending id order.
    ///
    /// Ordering the locks is what keeps two multi-item transactions (two
    /// checkouts sharing sweets, say) from deadlocking each other. Missing ids
    /// are silently absent from the result.
    pub async fn lock_many(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<Sweet>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sweets WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        sqlx::query_as::<_, Sweet>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    /// Take `n` units out of available stock.
    ///
    /// All-or-nothing: returns the new quantity, or `None` when the sweet is
    /// missing or holds fewer than `n` units, in which case nothing changed.
    pub async fn debit(
        conn: &mut PgConnection,
        id: DbId,
        n: Quantity,
    ) -> Result<Option<Quantity>, sqlx::Error> {
        let row: Option<(Quantity,)> = sqlx::query_as(
            "UPDATE sweets SET quantity = quantity - $2
             WHERE id = $1 AND quantity >= $2
             RETURNING quantity",
        )
        .bind(id)
        .bind(n)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Return `n` units to available stock. `None` if the sweet is missing.
    pub async fn credit(
        conn: &mut PgConnection,
        id: DbId,
        n: Quantity,
    ) -> Result<Option<Quantity>, sqlx::Error> {
        let row: Option<(Quantity,)> = sqlx::query_as(
            "UPDATE sweets SET quantity = quantity + $2 WHERE id = $1 RETURNING quantity",
        )
        .bind(id)
        .bind(n)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Overwrite available stock, ignoring outstanding reservations. Admin
    /// catalog updates only.
    pub async fn set_absolute(
        conn: &mut PgConnection,
        id: DbId,
        n: Quantity,
    ) -> Result<Option<Quantity>, sqlx::Error> {
        let row: Option<(Quantity,)> =
            sqlx::query_as("UPDATE sweets SET quantity = $2 WHERE id = $1 RETURNING quantity")
                .bind(id)
                .bind(n)
                .fetch_optional(conn)
                .await?;
        Ok(row.map(|r| r.0))
    }
}
