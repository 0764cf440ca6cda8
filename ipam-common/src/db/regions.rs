//! Known region reference list
//!
//! Read-only input to row classification and manual entry. Seeded once, when
//! the table is empty.

use crate::Result;

use super::init::{load_setting, DEFAULT_REGION_KEY};
use sqlx::SqlitePool;
use tracing::info;

/// Regions used when the reference table holds nothing
pub const FALLBACK_REGIONS: &[&str] = &["Douala", "Yaounde", "Yaoundé"];

/// Seed the region table if it is empty
///
/// Duplicate names in `regions` are skipped; list order is kept as `position`.
pub async fn seed_regions(pool: &SqlitePool, regions: &[String]) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM regions")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let mut seeded = 0usize;
    for (position, name) in regions.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        seeded += sqlx::query("INSERT OR IGNORE INTO regions (name, position) VALUES (?, ?)")
            .bind(name)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?
            .rows_affected() as usize;
    }
    tx.commit().await?;

    info!("Seeded {} regions", seeded);
    Ok(())
}

/// Load the ordered region list
///
/// Falls back to [`FALLBACK_REGIONS`] when the table is empty.
pub async fn load_regions(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM regions ORDER BY position, name")
        .fetch_all(pool)
        .await?;

    if names.is_empty() {
        return Ok(FALLBACK_REGIONS.iter().map(|r| r.to_string()).collect());
    }

    Ok(names)
}

/// Default region for new records
///
/// The `default_region` setting wins once stored; `fallback` (the TOML value)
/// covers a missing or blank setting.
pub async fn load_default_region(pool: &SqlitePool, fallback: &str) -> Result<String> {
    let stored = load_setting(pool, DEFAULT_REGION_KEY).await?;
    Ok(stored
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string()))
}
