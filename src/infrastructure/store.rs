use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tokio::fs;
use tracing::info;

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;

/// Durable OHLCV store backed by SQLite. Uniqueness on (symbol, date,
/// adapter) makes writes idempotent: re-collecting the same day from the
/// same adapter overwrites rather than duplicates.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self, AppError> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        AppError::Internal(format!("failed to create database directory: {e}"))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)
            .map_err(|e| AppError::Internal(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Internal(format!("failed to connect to sqlite: {e}")))?;

        info!(db_url, "store: connected");

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                volume TEXT NOT NULL,
                adapter TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(symbol, date, adapter)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create prices table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_symbol_date ON prices(symbol, date)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create price index: {e}")))?;

        Ok(())
    }

    pub async fn store_observations(&self, observations: &[PriceObservation]) -> Result<(), AppError> {
        if observations.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("failed to start transaction: {e}")))?;

        for obs in observations {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO prices
                (symbol, date, open, high, low, close, volume, adapter)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&obs.symbol)
            .bind(obs.date.to_string())
            .bind(obs.open.to_string())
            .bind(obs.high.to_string())
            .bind(obs.low.to_string())
            .bind(obs.close.to_string())
            .bind(obs.volume.to_string())
            .bind(&obs.adapter)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Internal(format!("failed to insert price row: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("failed to commit price rows: {e}")))?;

        info!(count = observations.len(), "store: wrote observations");
        Ok(())
    }

    pub async fn get_prices(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        adapter: Option<&str>,
    ) -> Result<Vec<PriceObservation>, AppError> {
        let mut query = String::from(
            "SELECT symbol, date, open, high, low, close, volume, adapter FROM prices WHERE symbol = ?",
        );
        if adapter.is_some() {
            query.push_str(" AND adapter = ?");
        }
        if start.is_some() {
            query.push_str(" AND date >= ?");
        }
        if end.is_some() {
            query.push_str(" AND date <= ?");
        }
        query.push_str(" ORDER BY date");

        let mut q = sqlx::query_as::<_, PriceRow>(&query).bind(symbol);
        if let Some(adapter) = adapter {
            q = q.bind(adapter);
        }
        if let Some(start) = start {
            q = q.bind(start.to_string());
        }
        if let Some(end) = end {
            q = q.bind(end.to_string());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to query prices: {e}")))?;

        rows.into_iter().map(PriceRow::into_observation).collect()
    }

    pub async fn get_latest_price(
        &self,
        symbol: &str,
        adapter: Option<&str>,
    ) -> Result<Option<Decimal>, AppError> {
        let mut query = String::from("SELECT close FROM prices WHERE symbol = ?");
        if adapter.is_some() {
            query.push_str(" AND adapter = ?");
        }
        query.push_str(" ORDER BY date DESC LIMIT 1");

        let mut q = sqlx::query_scalar::<_, String>(&query).bind(symbol);
        if let Some(adapter) = adapter {
            q = q.bind(adapter);
        }

        let row: Option<String> = q
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to query latest price: {e}")))?;

        row.map(|s| {
            Decimal::from_str(&s)
                .map_err(|e| AppError::Internal(format!("corrupt price in store: {e}")))
        })
        .transpose()
    }

    pub async fn get_symbols(&self) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT symbol FROM prices")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to query symbols: {e}")))
    }

    /// Fraction of `start..=end` calendar days present for `symbol`, used by
    /// the Router to decide whether a refetch is needed.
    pub async fn coverage_ratio(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64, AppError> {
        let total_days = (end - start).num_days() + 1;
        if total_days <= 0 {
            return Ok(1.0);
        }

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date) FROM prices WHERE symbol = ? AND date >= ? AND date <= ?",
        )
        .bind(symbol)
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("failed to compute coverage: {e}")))?;

        Ok(count as f64 / total_days as f64)
    }
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    symbol: String,
    date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
    adapter: String,
}

impl PriceRow {
    fn into_observation(self) -> Result<PriceObservation, AppError> {
        let parse = |s: &str| {
            Decimal::from_str(s).map_err(|e| AppError::Internal(format!("corrupt decimal in store: {e}")))
        };
        PriceObservation::new(
            self.symbol,
            NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .map_err(|e| AppError::Internal(format!("corrupt date in store: {e}")))?,
            parse(&self.open)?,
            parse(&self.high)?,
            parse(&self.low)?,
            parse(&self.close)?,
            parse(&self.volume)?,
            self.adapter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn test_store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    fn sample(symbol: &str, date: &str, adapter: &str) -> PriceObservation {
        PriceObservation::new(
            symbol,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(10),
            adapter,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stores_and_retrieves_observations() {
        let store = test_store().await;
        let obs = sample("BTC", "2024-01-01", "binance");
        store.store_observations(&[obs.clone()]).await.unwrap();

        let prices = store.get_prices("BTC", None, None, None).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0], obs);
    }

    #[tokio::test]
    async fn upsert_overwrites_same_symbol_date_adapter() {
        let store = test_store().await;
        store
            .store_observations(&[sample("BTC", "2024-01-01", "binance")])
            .await
            .unwrap();

        let mut updated = sample("BTC", "2024-01-01", "binance");
        updated.close = dec!(999);
        store.store_observations(&[updated]).await.unwrap();

        let prices = store.get_prices("BTC", None, None, None).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].close, dec!(999));
    }

    #[tokio::test]
    async fn coverage_ratio_reflects_missing_days() {
        let store = test_store().await;
        store
            .store_observations(&[sample("BTC", "2024-01-01", "binance")])
            .await
            .unwrap();

        let start = NaiveDate::parse_from_str("2024-01-01", "%Y-%m-%d").unwrap();
        let end = NaiveDate::parse_from_str("2024-01-04", "%Y-%m-%d").unwrap();
        let ratio = store.coverage_ratio("BTC", start, end).await.unwrap();
        assert!((ratio - 0.25).abs() < 1e-9);
    }
}
