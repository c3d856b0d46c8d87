//! SQLite-backed [`Store`] implementation.
//!
//! Nested documents (property details, whole reports) are stored as JSON
//! text; timestamps as Unix milliseconds. Upserts rely on the unique
//! indexes created by [`crate::migrate`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use bma_core::models::{Address, CachedBmaReport, LlmInstructions, PropertyDetails, RawPageData};
use bma_core::report::CacheKey;
use bma_core::store::{Store, UpsertOutcome};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ts_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("invalid timestamp: {}", ms))
}

fn raw_page_from_row(row: &SqliteRow) -> Result<RawPageData> {
    let details_json: Option<String> = row.get("property_details_json");
    let property_details = details_json
        .map(|json| serde_json::from_str::<PropertyDetails>(&json))
        .transpose()
        .context("corrupt property_details_json")?;
    Ok(RawPageData {
        id: row.get("id"),
        url: row.get("url"),
        content: row.get("content"),
        property_details,
    })
}

fn address_from_row(row: &SqliteRow) -> Address {
    Address {
        id: row.get("id"),
        raw_page_id: row.get("raw_page_id"),
        address_str: row.get("address_str"),
        enabled: row.get("enabled"),
        primary: row.get("is_primary"),
    }
}

const ADDRESS_COLUMNS: &str = "id, raw_page_id, address_str, enabled, is_primary";

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_raw_page(&self, page: &RawPageData) -> Result<UpsertOutcome> {
        let details = page
            .property_details
            .as_ref()
            .ok_or_else(|| anyhow!("raw page has no property details to key on"))?;
        let details_json = serde_json::to_string(details)?;

        // Insert-or-ignore first so the insert/update distinction is decided
        // by the unique index, not by a separate read.
        let new_id = Uuid::new_v4().to_string();
        let inserted = sqlx::query(
            r#"
            INSERT INTO raw_page_data (id, url, content, address, property_details_json)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(address) DO NOTHING
            "#,
        )
        .bind(&new_id)
        .bind(&page.url)
        .bind(&page.content)
        .bind(&details.address)
        .bind(&details_json)
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            return Ok(UpsertOutcome {
                id: new_id,
                inserted: true,
            });
        }

        let row = sqlx::query(
            r#"
            UPDATE raw_page_data
            SET url = ?, content = ?, property_details_json = ?
            WHERE address = ?
            RETURNING id
            "#,
        )
        .bind(&page.url)
        .bind(&page.content)
        .bind(&details_json)
        .bind(&details.address)
        .fetch_one(&self.pool)
        .await?;

        Ok(UpsertOutcome {
            id: row.get("id"),
            inserted: false,
        })
    }

    async fn get_raw_page(&self, id: &str) -> Result<Option<RawPageData>> {
        let row = sqlx::query(
            "SELECT id, url, content, property_details_json FROM raw_page_data WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(raw_page_from_row).transpose()
    }

    async fn delete_raw_page(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM raw_page_data WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_address(&self, address: &Address) -> Result<String> {
        let id = if address.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            address.id.clone()
        };
        sqlx::query(
            "INSERT INTO addresses (id, raw_page_id, address_str, enabled, is_primary) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&address.raw_page_id)
        .bind(&address.address_str)
        .bind(address.enabled)
        .bind(address.primary)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert address: {}", address.address_str))?;
        Ok(id)
    }

    async fn get_address(&self, id: &str) -> Result<Option<Address>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM addresses WHERE id = ?",
            ADDRESS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(address_from_row))
    }

    async fn find_address_by_str(&self, address_str: &str) -> Result<Option<Address>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM addresses WHERE address_str = ?",
            ADDRESS_COLUMNS
        ))
        .bind(address_str)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(address_from_row))
    }

    async fn list_addresses(&self) -> Result<Vec<Address>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM addresses ORDER BY rowid ASC",
            ADDRESS_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(address_from_row).collect())
    }

    async fn find_primary_address(&self) -> Result<Option<Address>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM addresses WHERE is_primary = 1 ORDER BY rowid ASC LIMIT 1",
            ADDRESS_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(address_from_row))
    }

    async fn find_comparison_addresses(&self) -> Result<Vec<Address>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM addresses WHERE enabled = 1 AND is_primary = 0 ORDER BY rowid ASC",
            ADDRESS_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(address_from_row).collect())
    }

    async fn clear_primary_flags(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE addresses SET is_primary = 0 WHERE is_primary = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_address_flags(&self, id: &str, enabled: bool, primary: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE addresses SET enabled = ?, is_primary = ? WHERE id = ?")
            .bind(enabled)
            .bind(primary)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_raw_page(&self, id: &str, raw_page_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE addresses SET raw_page_id = ? WHERE id = ?")
            .bind(raw_page_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_address(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_cached_report(&self, key: &CacheKey) -> Result<Option<CachedBmaReport>> {
        let row = sqlx::query(
            r#"
            SELECT generated_at, report_json FROM cached_bma_reports
            WHERE primary_address_id = ? AND comparison_address_ids = ?
            "#,
        )
        .bind(key.primary_id())
        .bind(key.comparison_ids_json())
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let report_json: String = row.get("report_json");
        let report = serde_json::from_str(&report_json).context("corrupt report_json")?;
        Ok(Some(CachedBmaReport::new(
            key,
            ts_from_millis(row.get("generated_at"))?,
            report,
        )))
    }

    async fn upsert_cached_report(&self, report: &CachedBmaReport) -> Result<()> {
        let key = report.key();
        let report_json = serde_json::to_string(&report.report)?;
        sqlx::query(
            r#"
            INSERT INTO cached_bma_reports
                (id, primary_address_id, comparison_address_ids, generated_at, report_json)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(primary_address_id, comparison_address_ids) DO UPDATE SET
                generated_at = excluded.generated_at,
                report_json = excluded.report_json
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(key.primary_id())
        .bind(key.comparison_ids_json())
        .bind(report.generated_at.timestamp_millis())
        .bind(&report_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_cached_report(&self, key: &CacheKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM cached_bma_reports WHERE primary_address_id = ? AND comparison_address_ids = ?",
        )
        .bind(key.primary_id())
        .bind(key.comparison_ids_json())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_cached_reports(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_bma_reports")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_instructions(&self) -> Result<Option<LlmInstructions>> {
        let row = sqlx::query(
            "SELECT instructions, updated_at FROM llm_instructions ORDER BY updated_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(LlmInstructions {
                instructions: row.get("instructions"),
                updated_at: ts_from_millis(row.get("updated_at"))?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_instructions(&self, instructions: &LlmInstructions) -> Result<()> {
        sqlx::query("INSERT INTO llm_instructions (id, instructions, updated_at) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(&instructions.instructions)
            .bind(instructions.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_instructions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM llm_instructions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
