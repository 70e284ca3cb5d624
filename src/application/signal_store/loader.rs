use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use crate::application::signal_store::lot_sizing::{self, AssetCategory, LotSizeCalculation};
use crate::domain::errors::AppError;
use crate::domain::signal::TradeCategory;

const CATEGORIES: [TradeCategory; 3] = [TradeCategory::Scalp, TradeCategory::Swing, TradeCategory::LongTerm];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPlan {
    pub entry_price: f64,
    pub entry_strategy: &'static str,
    pub next_trading_day: DateTime<Utc>,
    pub wait_for_open: bool,
    pub note: String,
}

/// Merges every per-category signal file for a date into one set, filtered
/// to the requested symbol when given.
pub struct SignalLoader {
    directory: PathBuf,
}

impl SignalLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    fn category_file(&self, category: TradeCategory, date: NaiveDate) -> PathBuf {
        self.directory.join(format!("signals_{}_{}.json", category.as_str(), date.format("%Y%m%d")))
    }

    fn summary_file(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(format!("daily_signals_summary_{}.json", date.format("%Y%m%d")))
    }

    fn performance_file(&self, date: NaiveDate) -> PathBuf {
        self.directory.join("performance").join(format!("performance_{}.json", date.format("%Y%m%d")))
    }

    async fn read_json_file(path: &Path) -> Option<Value> {
        match fs::read_to_string(path).await {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "signal_loader: malformed JSON, skipping");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "signal_loader: failed to read file");
                None
            }
        }
    }

    /// Loads and merges every category's signals for the date; a file can
    /// hold either a single object or a list, matching the original layout.
    pub async fn load_signals_for_date(&self, date: NaiveDate, symbol_filter: Option<&str>) -> Vec<Value> {
        let mut merged = Vec::new();
        for category in CATEGORIES {
            let path = self.category_file(category, date);
            let Some(value) = Self::read_json_file(&path).await else { continue };
            let entries: Vec<Value> = match value {
                Value::Array(items) => items,
                single => vec![single],
            };
            merged.extend(entries);
        }

        match symbol_filter {
            Some(symbol) => merged
                .into_iter()
                .filter(|v| v.get("symbol").and_then(Value::as_str) == Some(symbol))
                .collect(),
            None => merged,
        }
    }

    pub async fn load_daily_summary(&self, date: NaiveDate) -> Option<Value> {
        Self::read_json_file(&self.summary_file(date)).await
    }

    pub async fn load_performance(&self, date: NaiveDate) -> Option<Value> {
        Self::read_json_file(&self.performance_file(date)).await
    }
}

fn classify_asset(symbol: &str) -> AssetCategory {
    const CRYPTO_SYMBOLS: [&str; 6] = ["BTC", "ETH", "SOL", "BNB", "ADA", "XRP"];
    if CRYPTO_SYMBOLS.contains(&symbol) {
        AssetCategory::Crypto
    } else {
        AssetCategory::Forex
    }
}

/// Computes the next America/New_York market open (9:30am), skipping
/// weekends and rolling to the following day once past 4pm ET.
fn next_trading_day_ny(now_utc: DateTime<Utc>) -> DateTime<Utc> {
    let now_ny = now_utc.with_timezone(&New_York);
    let mut candidate_date = now_ny.date_naive();
    if now_ny.hour() >= 16 {
        candidate_date += chrono::Duration::days(1);
    }
    while matches!(candidate_date.weekday(), Weekday::Sat | Weekday::Sun) {
        candidate_date += chrono::Duration::days(1);
    }
    let open = candidate_date.and_hms_opt(9, 30, 0).unwrap();
    New_York.from_local_datetime(&open).single().unwrap_or_else(|| New_York.from_utc_datetime(&open)).with_timezone(&Utc)
}

/// Crypto trades immediately at the current price (24/7); traditional
/// markets plan a limit order for the next NY market open.
pub fn plan_next_entry(symbol: &str, current_price: f64, now_utc: DateTime<Utc>) -> EntryPlan {
    match classify_asset(symbol) {
        AssetCategory::Crypto => EntryPlan {
            entry_price: current_price,
            entry_strategy: "market",
            next_trading_day: now_utc + chrono::Duration::days(1),
            wait_for_open: false,
            note: "crypto markets are 24/7, can enter at any time".to_string(),
        },
        _ => {
            let next_open = next_trading_day_ny(now_utc);
            EntryPlan {
                entry_price: current_price,
                entry_strategy: "limit",
                next_trading_day: next_open,
                wait_for_open: now_utc < next_open,
                note: format!("place a limit order before market open at {next_open}"),
            }
        }
    }
}

/// Enriches a loaded signal's JSON value with lot sizing and next-entry
/// planning, using fields present on the original signal object.
pub fn enrich_signal(
    signal: &Value,
    account_balance_usd: f64,
    risk_per_trade_pct: f64,
    now_utc: DateTime<Utc>,
) -> Result<(LotSizeCalculation, EntryPlan), AppError> {
    let symbol = signal
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::validation("signal missing symbol"))?;
    let entry_price = signal
        .get("entry")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::validation("signal missing entry"))?;
    let stop_loss = signal.get("sl").and_then(Value::as_f64).unwrap_or(entry_price);

    let category = classify_asset(symbol);
    let lot = lot_sizing::calculate(symbol, entry_price, stop_loss, account_balance_usd, risk_per_trade_pct, category);
    let plan = plan_next_entry(symbol, entry_price, now_utc);
    Ok((lot, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn crypto_entry_is_immediate() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let plan = plan_next_entry("BTC", 65_000.0, now);
        assert_eq!(plan.entry_strategy, "market");
        assert!(!plan.wait_for_open);
    }

    #[test]
    fn traditional_asset_entry_waits_for_market_open() {
        let saturday_noon_utc = Utc.with_ymd_and_hms(2024, 6, 8, 16, 0, 0).unwrap();
        let plan = plan_next_entry("AAPL", 200.0, saturday_noon_utc);
        assert_eq!(plan.entry_strategy, "limit");
        assert!(plan.wait_for_open);
        assert_eq!(plan.next_trading_day.with_timezone(&New_York).weekday(), Weekday::Mon);
    }
}
