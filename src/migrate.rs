//! Database schema migrations (idempotent).
//!
//! Creates the four collections and their unique indexes. The unique
//! indexes carry the upsert semantics: one raw page per extracted address,
//! one address record per address string, one cached report per
//! `(primary, sorted comparison set)`.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Open the configured database and run all migrations.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Run all migrations against an open pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_page_data (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            content TEXT NOT NULL,
            address TEXT NOT NULL,
            property_details_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS addresses (
            id TEXT PRIMARY KEY,
            raw_page_id TEXT,
            address_str TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 0,
            is_primary INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cached_bma_reports (
            id TEXT PRIMARY KEY,
            primary_address_id TEXT NOT NULL,
            comparison_address_ids TEXT NOT NULL,
            generated_at INTEGER NOT NULL,
            report_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS llm_instructions (
            id TEXT PRIMARY KEY,
            instructions TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_raw_page_data_address ON raw_page_data(address)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_addresses_address_str ON addresses(address_str)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_cached_bma_reports_key
        ON cached_bma_reports(primary_address_id, comparison_address_ids)
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_addresses_flags ON addresses(enabled, is_primary)")
        .execute(pool)
        .await?;

    tracing::debug!("Schema migrations applied");
    Ok(())
}
