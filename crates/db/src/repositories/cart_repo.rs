//! Cart store: reserved lines in the `cart_items` table.
//!
//! Writers take `&mut PgConnection` and expect the caller to already hold
//! the user lock and the lock on the sweet row the line points at.

use sqlx::{PgConnection, PgExecutor};
use sweetshop_core::types::{DbId, Quantity};

use crate::models::cart::{CartItem, CartLine};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, sweet_id, quantity, created_at, updated_at";

/// Joined projection used by [`CartRepo::lines_for`].
const LINE_SELECT: &str = "SELECT c.id, c.sweet_id, s.name AS sweet_name, \
                           s.price AS sweet_price, c.quantity \
                           FROM cart_items c JOIN sweets s ON s.id = c.sweet_id";

pub struct CartRepo;

impl CartRepo {
    /// Add `delta` to the user's line for `sweet_id`, creating the line if
    /// there is none. Returns the line as stored.
    pub async fn upsert_line(
        conn: &mut PgConnection,
        user_id: DbId,
        sweet_id: DbId,
        delta: Quantity,
    ) -> Result<CartItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO cart_items (user_id, sweet_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_cart_items_user_sweet
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CartItem>(&query)
            .bind(user_id)
            .bind(sweet_id)
            .bind(delta)
            .fetch_one(conn)
            .await
    }

    /// Set the user's line for `sweet_id` to an absolute quantity.
    ///
    /// A quantity of zero or below deletes the line and returns `None`.
    /// Also `None` when there was no line to set.
    pub async fn set_line(
        conn: &mut PgConnection,
        user_id: DbId,
        sweet_id: DbId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        if quantity <= 0 {
            Self::remove_line(conn, user_id, sweet_id).await?;
            return Ok(None);
        }
        let query = format!(
            "UPDATE cart_items SET quantity = $3
             WHERE user_id = $1 AND sweet_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CartItem>(&query)
            .bind(user_id)
            .bind(sweet_id)
            .bind(quantity)
            .fetch_optional(conn)
            .await
    }

    /// Delete the user's line for `sweet_id`. Idempotent: returns whether a
    /// line was actually removed, never an error for a missing line.
    pub async fn remove_line(
        conn: &mut PgConnection,
        user_id: DbId,
        sweet_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND sweet_id = $2")
            .bind(user_id)
            .bind(sweet_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every line the user holds. Returns the number of lines removed.
    pub async fn clear(conn: &mut PgConnection, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Snapshot of the user's lines joined with sweet name and price,
    /// ordered by line id.
    pub async fn lines_for<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
    ) -> Result<Vec<CartLine>, sqlx::Error> {
        let query = format!("{LINE_SELECT} WHERE c.user_id = $1 ORDER BY c.id");
        sqlx::query_as::<_, CartLine>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Ids of the sweets the user currently reserves, ascending.
    pub async fn sweet_ids_for(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT sweet_id FROM cart_items WHERE user_id = $1 ORDER BY sweet_id",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Find a line by id, scoped to its owner. Lines belonging to other users
    /// are indistinguishable from missing ones.
    pub async fn find_owned<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        line_id: DbId,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cart_items WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, CartItem>(&query)
            .bind(line_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Find the user's line for one sweet.
    pub async fn find_for_sweet<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        sweet_id: DbId,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM cart_items WHERE user_id = $1 AND sweet_id = $2");
        sqlx::query_as::<_, CartItem>(&query)
            .bind(user_id)
            .bind(sweet_id)
            .fetch_optional(executor)
            .await
    }

    /// Outstanding reservations against one sweet across all users:
    /// `(line_count, reserved_units)`.
    pub async fn reservations_for_sweet<'e>(
        executor: impl PgExecutor<'e>,
        sweet_id: DbId,
    ) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(quantity), 0)::BIGINT
             FROM cart_items WHERE sweet_id = $1",
        )
        .bind(sweet_id)
        .fetch_one(executor)
        .await
    }
}
