//! Repository for catalog reads and writes on the `sweets` table.
//!
//! Stock movements do not go through here; see
//! [`LedgerRepo`](super::LedgerRepo).

use sqlx::{PgExecutor, PgPool};
use sweetshop_core::catalog::like_pattern;
use sweetshop_core::types::DbId;

use crate::models::sweet::{CreateSweet, Sweet, SweetFilter, UpdateSweet};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, name, category, price, quantity, created_at, updated_at";

pub struct SweetRepo;

impl SweetRepo {
    /// Insert a new sweet, returning the created row.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateSweet,
    ) -> Result<Sweet, sqlx::Error> {
        let query = format!(
            "INSERT INTO sweets (name, category, price, quantity)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Sweet>(&query)
            .bind(input.name.trim())
            .bind(input.category.trim())
            .bind(input.price)
            .bind(input.quantity)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Sweet>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sweets WHERE id = $1");
        sqlx::query_as::<_, Sweet>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List sweets matching `filter`, ordered by name.
    ///
    /// Text filters are case-insensitive substring matches.
    pub async fn search(pool: &PgPool, filter: &SweetFilter) -> Result<Vec<Sweet>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sweets
             WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR category ILIKE $1)
               AND ($2::TEXT IS NULL OR name ILIKE $2)
               AND ($3::TEXT IS NULL OR category ILIKE $3)
               AND ($4::NUMERIC IS NULL OR price >= $4)
               AND ($5::NUMERIC IS NULL OR price <= $5)
             ORDER BY name, id"
        );
        sqlx::query_as::<_, Sweet>(&query)
            .bind(pattern(filter.text.as_deref()))
            .bind(pattern(filter.name.as_deref()))
            .bind(pattern(filter.category.as_deref()))
            .bind(filter.min_price)
            .bind(filter.max_price)
            .fetch_all(pool)
            .await
    }

    /// Update catalog fields. Only non-`None` fields in `input` are applied;
    /// `input.quantity` is ignored here because stock moves through
    /// [`LedgerRepo`](super::LedgerRepo).
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        input: &UpdateSweet,
    ) -> Result<Option<Sweet>, sqlx::Error> {
        let query = format!(
            "UPDATE sweets SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                price = COALESCE($4, price)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Sweet>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(input.category.as_deref().map(str::trim))
            .bind(input.price)
            .fetch_optional(executor)
            .await
    }

    /// Delete a sweet. Cart lines referencing it go with it (`ON DELETE
    /// CASCADE`). Returns `true` if a row was deleted.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sweets WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count<'e>(executor: impl PgExecutor<'e>) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sweets")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

/// Blank filters are treated as absent.
fn pattern(needle: Option<&str>) -> Option<String> {
    needle
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern)
}
