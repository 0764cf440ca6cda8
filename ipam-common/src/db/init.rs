//! Database initialization
//!
//! Opens (or creates) the registry database, applies connection pragmas,
//! creates the schema and fills in default settings and the region list.
//! Every step is idempotent, so it is safe to run on each startup.

use crate::config::TomlConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::regions::seed_regions;

/// Settings key of the runtime default region
pub const DEFAULT_REGION_KEY: &str = "default_region";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, config: &TomlConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while one writer commits
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    prepare_schema(&pool, config).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Holds a single connection: every SQLite `:memory:` connection is its own database.
pub async fn init_memory_database(config: &TomlConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    prepare_schema(&pool, config).await?;

    Ok(pool)
}

async fn prepare_schema(pool: &SqlitePool, config: &TomlConfig) -> Result<()> {
    create_schema(pool).await?;
    init_default_settings(pool, config).await?;
    seed_regions(pool, &config.known_regions).await?;
    Ok(())
}

/// Create every registry table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_addresses_table(pool).await?;
    create_tags_table(pool).await?;
    create_owners_table(pool).await?;
    create_regions_table(pool).await?;

    // Linking tables
    create_address_tags_table(pool).await?;
    create_address_owners_table(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the addresses table
///
/// `address` is globally unique. `status` is derived from owner links and is
/// rewritten in the same transaction as any owner-link change.
pub async fn create_addresses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS addresses (
            guid TEXT PRIMARY KEY,
            address TEXT NOT NULL UNIQUE,
            region TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'INACTIVE' CHECK (status IN ('ACTIVE', 'INACTIVE')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (length(trim(address)) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_addresses_status ON addresses(status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            guid TEXT PRIMARY KEY,
            value TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_owners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS owners (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            region TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_regions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regions (
            name TEXT PRIMARY KEY,
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Address ↔ tag junction; rows vanish with their address
async fn create_address_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS address_tags (
            address_id TEXT NOT NULL REFERENCES addresses(guid) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tags(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (address_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_address_tags_tag ON address_tags(tag_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Address ↔ owner junction; rows vanish with their address
async fn create_address_owners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS address_owners (
            address_id TEXT NOT NULL REFERENCES addresses(guid) ON DELETE CASCADE,
            owner_id TEXT NOT NULL REFERENCES owners(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (address_id, owner_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_address_owners_owner ON address_owners(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize default settings
///
/// `api_shared_secret` is left out: the first [`load_shared_secret`] call
/// generates a random one.
///
/// [`load_shared_secret`]: crate::api::load_shared_secret
async fn init_default_settings(pool: &SqlitePool, config: &TomlConfig) -> Result<()> {
    ensure_setting(pool, DEFAULT_REGION_KEY, &config.default_region).await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE handles concurrent initialization races
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting value
pub async fn load_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Write a setting value
pub async fn store_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
