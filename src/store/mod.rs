//! Durable ticker and price-history store
//!
//! Wraps a SQLite pool behind an explicitly constructed handle with a clear
//! lifecycle: opened at process start, cloned cheaply into tasks, connections
//! scoped-acquired per operation. Writes run inside transactions that roll
//! back completely on failure.

mod types;

pub use types::{PricePoint, StoreError, Ticker};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Default page size for history queries
pub const DEFAULT_HISTORY_ROWS: u32 = 15;

/// Hard ceiling on history page size, regardless of what the caller asks for
pub const MAX_HISTORY_ROWS: u32 = 1000;

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

type PriceRow = (i64, i64, String, DateTime<Utc>);

/// Handle to the ticker + price-history tables
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (creating if missing) the database at `url` and ensure the schema exists
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Open an in-memory database, useful for tests and demos
    pub async fn in_memory() -> Result<Self, StoreError> {
        // A single connection so every operation sees the same memory database
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a ticker with no price history yet
    pub async fn create_ticker(&self, name: &str) -> Result<Ticker, StoreError> {
        let result = sqlx::query("INSERT INTO ticker (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(Ticker {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Create a ticker together with its initial price point, atomically
    pub async fn seed_ticker(&self, name: &str, price: Decimal) -> Result<Ticker, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO ticker (name) VALUES (?1)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let id = result.last_insert_rowid();
        sqlx::query("INSERT INTO ticker_price (ticker_id, price, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(price.to_string())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Ticker {
            id,
            name: name.to_string(),
        })
    }

    /// Look up a ticker by name
    pub async fn get_ticker(&self, name: &str) -> Result<Option<Ticker>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM ticker WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Ticker { id, name }))
    }

    /// Names of every tracked ticker
    pub async fn list_tickers(&self) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM ticker ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    /// The price point with the maximum id for `name`, or `None` if the ticker
    /// has no history (or does not exist)
    pub async fn latest_price(&self, name: &str) -> Result<Option<PricePoint>, StoreError> {
        let row = sqlx::query_as::<_, PriceRow>(
            "SELECT p.id, p.ticker_id, p.price, p.created_at \
             FROM ticker_price p JOIN ticker t ON t.id = p.ticker_id \
             WHERE t.name = ?1 ORDER BY p.id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(decode_row).transpose()
    }

    /// Append one price point for `name`
    ///
    /// `at` defaults to the current time. Fails with
    /// [`StoreError::UnknownTicker`] when the ticker does not exist; the
    /// transaction rolls back on any failure.
    pub async fn append_price(
        &self,
        name: &str,
        price: Decimal,
        at: Option<DateTime<Utc>>,
    ) -> Result<PricePoint, StoreError> {
        let created_at = at.unwrap_or_else(Utc::now);
        let mut tx = self.pool.begin().await?;
        let ticker_id =
            sqlx::query_scalar::<_, i64>("SELECT id FROM ticker WHERE name = ?1")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::UnknownTicker(name.to_string()))?;
        let result =
            sqlx::query("INSERT INTO ticker_price (ticker_id, price, created_at) VALUES (?1, ?2, ?3)")
                .bind(ticker_id)
                .bind(price.to_string())
                .bind(created_at)
                .execute(&mut *tx)
                .await?;
        let id = result.last_insert_rowid();
        tx.commit().await?;
        Ok(PricePoint {
            id,
            ticker_id,
            price,
            created_at,
        })
    }

    /// Chronological history page for `name`
    ///
    /// With `after` absent, returns the most recent `max_rows` points in
    /// ascending order. With `after` present, returns up to `max_rows` points
    /// strictly newer than it, ascending. `max_rows` is capped at
    /// [`MAX_HISTORY_ROWS`].
    pub async fn history_since(
        &self,
        name: &str,
        after: Option<DateTime<Utc>>,
        max_rows: u32,
    ) -> Result<Vec<PricePoint>, StoreError> {
        let cap = max_rows.min(MAX_HISTORY_ROWS) as i64;
        let rows = match after {
            Some(after) => {
                sqlx::query_as::<_, PriceRow>(
                    "SELECT p.id, p.ticker_id, p.price, p.created_at \
                     FROM ticker_price p JOIN ticker t ON t.id = p.ticker_id \
                     WHERE t.name = ?1 AND p.created_at > ?2 \
                     ORDER BY p.id ASC LIMIT ?3",
                )
                .bind(name)
                .bind(after)
                .bind(cap)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PriceRow>(
                    "SELECT id, ticker_id, price, created_at FROM ( \
                         SELECT p.id, p.ticker_id, p.price, p.created_at \
                         FROM ticker_price p JOIN ticker t ON t.id = p.ticker_id \
                         WHERE t.name = ?1 ORDER BY p.id DESC LIMIT ?2 \
                     ) ORDER BY id ASC",
                )
                .bind(name)
                .bind(cap)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(decode_row).collect()
    }
}

fn decode_row((id, ticker_id, price, created_at): PriceRow) -> Result<PricePoint, StoreError> {
    let price = Decimal::from_str(&price).map_err(|_| StoreError::BadPrice(price.clone()))?;
    Ok(PricePoint {
        id,
        ticker_id,
        price,
        created_at,
    })
}
