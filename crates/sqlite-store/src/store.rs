use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marketplace_indexer::{
    BlockPosition, GrowthContext, GrowthEventEntry, GrowthEventType, GrowthLedger,
    IndexedListingRecord, IndexedOfferRecord, RelationalStore,
};
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A listing row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub block_number: u64,
    pub log_index: u64,
    pub status: String,
    pub seller_address: String,
    pub data: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An offer row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRow {
    pub id: String,
    pub listing_id: String,
    pub status: String,
    pub seller_address: String,
    pub buyer_address: String,
    pub data: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// SQLite-backed [`RelationalStore`] and [`GrowthLedger`].
///
/// Upserts never clear a timestamp column: a record written with `updated_at` keeps
/// the `created_at` of an earlier insert and the other way round.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn is_memory(path: &str) -> bool {
    path == ":memory:" || path == "sqlite::memory:"
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{what} {value} does not fit in a sqlite integer"))
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// Accepts `:memory:`, a `sqlite:` URL or a file path. Parent directories of a file
    /// path are created.
    pub async fn connect(path: &str) -> Result<Self> {
        let memory = is_memory(path);
        if !memory && !path.starts_with("sqlite:") {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
                }
            }
        }

        let url = if memory {
            "sqlite::memory:".to_string()
        } else if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };

        let mut options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to an in-memory database gets its own database.
        let max_connections = if memory { 1 } else { DEFAULT_MAX_CONNECTIONS };

        tracing::debug!(
            target: "marketplace_sqlite::store",
            url = %url,
            max_connections,
            "Connecting to database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to sqlite database {url}"))?;

        let store = Self { pool };
        store.load_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_schema(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let sql = statement
                .lines()
                .filter(|line| {
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with("--")
                })
                .collect::<Vec<_>>()
                .join("\n");
            if sql.is_empty() {
                continue;
            }

            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| {
                    format!("Failed to execute SQL: {}", sql.lines().next().unwrap_or(""))
                })?;
        }

        tracing::info!(target: "marketplace_sqlite::store", "Marketplace schema initialized");
        Ok(())
    }

    pub async fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        let row = sqlx::query(
            "SELECT id, block_number, log_index, status, seller_address, data, created_at, updated_at
             FROM listings WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| listing_from_row(&row)).transpose()
    }

    pub async fn get_offer(&self, id: &str) -> Result<Option<OfferRow>> {
        let row = sqlx::query(
            "SELECT id, listing_id, status, seller_address, buyer_address, data, created_at, updated_at
             FROM offers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| offer_from_row(&row)).transpose()
    }

    pub async fn listing_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn offer_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Growth entries recorded for `actor_address`, oldest first.
    pub async fn growth_events_for(&self, actor_address: &str) -> Result<Vec<GrowthEventEntry>> {
        let rows = sqlx::query(
            "SELECT actor_address, event_type, subject_id, block_number, log_index, occurred_at
             FROM growth_events WHERE actor_address = ?1 ORDER BY id",
        )
        .bind(actor_address.to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(growth_from_row).collect()
    }
}

fn listing_from_row(row: &SqliteRow) -> Result<ListingRow> {
    let data: String = row.try_get("data")?;
    Ok(ListingRow {
        id: row.try_get("id")?,
        block_number: row.try_get::<i64, _>("block_number")? as u64,
        log_index: row.try_get::<i64, _>("log_index")? as u64,
        status: row.try_get("status")?,
        seller_address: row.try_get("seller_address")?,
        data: serde_json::from_str(&data).context("invalid listing data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn offer_from_row(row: &SqliteRow) -> Result<OfferRow> {
    let data: String = row.try_get("data")?;
    Ok(OfferRow {
        id: row.try_get("id")?,
        listing_id: row.try_get("listing_id")?,
        status: row.try_get("status")?,
        seller_address: row.try_get("seller_address")?,
        buyer_address: row.try_get("buyer_address")?,
        data: serde_json::from_str(&data).context("invalid offer data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn growth_from_row(row: &SqliteRow) -> Result<GrowthEventEntry> {
    let event_type: String = row.try_get("event_type")?;
    Ok(GrowthEventEntry {
        actor_address: row.try_get("actor_address")?,
        event_type: serde_json::from_value::<GrowthEventType>(Value::String(event_type.clone()))
            .with_context(|| format!("unknown growth event type {event_type}"))?,
        subject_id: row.try_get("subject_id")?,
        context: GrowthContext {
            block_info: BlockPosition::new(
                row.try_get::<i64, _>("block_number")? as u64,
                row.try_get::<i64, _>("log_index")? as u64,
            ),
        },
        timestamp: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn upsert_listing(&self, record: &IndexedListingRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listings
                (id, block_number, log_index, status, seller_address, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                block_number = excluded.block_number,
                log_index = excluded.log_index,
                status = excluded.status,
                seller_address = excluded.seller_address,
                data = excluded.data,
                created_at = COALESCE(excluded.created_at, listings.created_at),
                updated_at = COALESCE(excluded.updated_at, listings.updated_at)
        "#,
        )
        .bind(&record.id)
        .bind(to_i64(record.block_number, "block number")?)
        .bind(to_i64(record.log_index, "log index")?)
        .bind(&record.status)
        .bind(&record.seller_address)
        .bind(serde_json::to_string(&record.data)?)
        .bind(record.timestamp.created_at())
        .bind(record.timestamp.updated_at())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert listing {}", record.id))?;

        tracing::trace!(
            target: "marketplace_sqlite::store",
            id = %record.id,
            block_number = record.block_number,
            "Upserted listing"
        );
        Ok(())
    }

    async fn upsert_offer(&self, record: &IndexedOfferRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offers
                (id, listing_id, status, seller_address, buyer_address, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                listing_id = excluded.listing_id,
                status = excluded.status,
                seller_address = excluded.seller_address,
                buyer_address = excluded.buyer_address,
                data = excluded.data,
                created_at = COALESCE(excluded.created_at, offers.created_at),
                updated_at = COALESCE(excluded.updated_at, offers.updated_at)
        "#,
        )
        .bind(&record.id)
        .bind(&record.listing_id)
        .bind(&record.status)
        .bind(&record.seller_address)
        .bind(&record.buyer_address)
        .bind(serde_json::to_string(&record.data)?)
        .bind(record.timestamp.created_at())
        .bind(record.timestamp.updated_at())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert offer {}", record.id))?;

        tracing::trace!(target: "marketplace_sqlite::store", id = %record.id, "Upserted offer");
        Ok(())
    }
}

#[async_trait]
impl GrowthLedger for SqliteStore {
    async fn insert(&self, entry: &GrowthEventEntry) -> Result<()> {
        let position = entry.context.block_info;
        sqlx::query(
            "INSERT INTO growth_events
                (actor_address, event_type, subject_id, block_number, log_index, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&entry.actor_address)
        .bind(entry.event_type.as_str())
        .bind(&entry.subject_id)
        .bind(to_i64(position.block_number, "block number")?)
        .bind(to_i64(position.log_index, "log index")?)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "failed to insert {} growth event for {}",
                entry.event_type, entry.actor_address
            )
        })?;
        Ok(())
    }
}
