//! Startup seeding of the default catalog.

use sweetshop_core::catalog::DEFAULT_CATALOG;

use crate::models::sweet::CreateSweet;
use crate::repositories::SweetRepo;
use crate::DbPool;

/// Insert the default assortment if the catalog is empty.
///
/// Idempotent and safe to race: the table lock makes a concurrent second
/// caller wait, then see a non-empty catalog. Returns the number of sweets
/// inserted (zero when the catalog already had rows).
pub async fn seed_default_catalog(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("LOCK TABLE sweets IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    if SweetRepo::count(&mut *tx).await? > 0 {
        return Ok(0);
    }

    for seed in DEFAULT_CATALOG {
        let input = CreateSweet {
            name: seed.name.to_string(),
            category: seed.category.to_string(),
            price: seed.price(),
            quantity: seed.quantity,
        };
        SweetRepo::create(&mut *tx, &input).await?;
    }
    tx.commit().await?;

    tracing::info!(count = DEFAULT_CATALOG.len(), "Seeded default catalog");
    Ok(DEFAULT_CATALOG.len())
}
