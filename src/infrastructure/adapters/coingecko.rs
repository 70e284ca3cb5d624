use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::{info, warn};

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;
use crate::domain::ports::Adapter;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::rate_limiter::RateLimiter;

const NAME: &str = "coingecko";
const RATE_LIMIT_PER_MINUTE_NO_KEY: u32 = 30;
const RATE_LIMIT_PER_MINUTE_WITH_KEY: u32 = 50;

fn fallback_symbol_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("SOL", "solana"),
        ("BNB", "binancecoin"),
        ("ADA", "cardano"),
        ("AVAX", "avalanche-2"),
        ("MATIC", "matic-network"),
        ("DOT", "polkadot"),
        ("LINK", "chainlink"),
        ("UNI", "uniswap"),
        ("ATOM", "cosmos"),
        ("ALGO", "algorand"),
        ("XRP", "ripple"),
        ("DOGE", "dogecoin"),
        ("SHIB", "shiba-inu"),
    ])
}

pub struct CoinGeckoAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter,
    symbol_map: RwLock<Option<HashMap<String, String>>>,
}

impl CoinGeckoAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let limit = if api_key.is_some() {
            RATE_LIMIT_PER_MINUTE_WITH_KEY
        } else {
            RATE_LIMIT_PER_MINUTE_NO_KEY
        };
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            api_key,
            rate_limiter: RateLimiter::new(limit),
            symbol_map: RwLock::new(None),
        }
    }

    fn apply_api_key(
        &self,
        mut req: reqwest_middleware::RequestBuilder,
    ) -> reqwest_middleware::RequestBuilder {
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }
        req
    }

    async fn symbol_to_id(&self, symbol: &str) -> String {
        if let Some(map) = self.symbol_map.read().expect("lock poisoned").as_ref() {
            if let Some(id) = map.get(symbol) {
                return id.clone();
            }
        }

        let url = format!("{}/coins/list", self.base_url);
        let req = self.apply_api_key(self.client.get(&url));
        let fetched: Option<HashMap<String, String>> = async {
            let response = req.send().await.ok()?;
            let coins: Vec<serde_json::Value> = response.json().await.ok()?;
            let mut map = HashMap::new();
            for coin in coins {
                let symbol = coin.get("symbol")?.as_str()?.to_uppercase();
                let id = coin.get("id")?.as_str()?.to_string();
                map.entry(symbol).or_insert(id);
            }
            Some(map)
        }
        .await;

        let map = fetched.unwrap_or_else(|| {
            warn!("coingecko: falling back to static symbol map");
            fallback_symbol_map()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        });

        let id = map
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| symbol.to_lowercase());
        *self.symbol_map.write().expect("lock poisoned") = Some(map);
        id
    }
}

#[async_trait]
impl Adapter for CoinGeckoAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn rate_limit_per_minute(&self) -> u32 {
        if self.api_key.is_some() {
            RATE_LIMIT_PER_MINUTE_WITH_KEY
        } else {
            RATE_LIMIT_PER_MINUTE_NO_KEY
        }
    }

    async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError> {
        let today = Utc::now().date_naive();
        let start = today - chrono::Duration::days(2);
        let mut obs = self.fetch_historical(symbol, start, today).await?;
        obs.sort_by_key(|o| o.date);
        obs.pop()
            .ok_or_else(|| AppError::data_insufficient(format!("no recent data for {symbol}")))
    }

    async fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, AppError> {
        self.rate_limiter.acquire(NAME).await;

        let coin_id = self.symbol_to_id(symbol).await;
        let mut days = (end - start).num_days().max(1);
        if days > 365 {
            days = 365;
        }

        let url = format!("{}/coins/{coin_id}/ohlc", self.base_url);
        let days_str = days.to_string();
        let url = build_url_with_query(&url, &[("vs_currency", "usd"), ("days", &days_str)]);

        let response = self
            .apply_api_key(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("coingecko request failed: {e}")))?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "coingecko ohlc fetch failed: {text}"
            )));
        }

        let rows: Vec<[serde_json::Value; 5]> = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("coingecko ohlc response malformed: {e}"))
        })?;

        let observations: Vec<PriceObservation> = rows
            .into_iter()
            .filter_map(|row| {
                let ts_ms = row[0].as_i64()?;
                let date = Utc.timestamp_millis_opt(ts_ms).single()?.date_naive();
                if date < start || date > end {
                    return None;
                }
                let open = Decimal::from_f64(row[1].as_f64()?)?;
                let high = Decimal::from_f64(row[2].as_f64()?)?;
                let low = Decimal::from_f64(row[3].as_f64()?)?;
                let close = Decimal::from_f64(row[4].as_f64()?)?;
                PriceObservation::new(symbol, date, open, high, low, close, Decimal::ZERO, NAME)
                    .ok()
            })
            .collect();

        info!(symbol, count = observations.len(), "coingecko: fetched ohlc");
        Ok(observations)
    }

    async fn supported_symbols(&self) -> Result<Vec<String>, AppError> {
        Ok(fallback_symbol_map()
            .into_keys()
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_map_covers_major_symbols() {
        let map = fallback_symbol_map();
        assert_eq!(map.get("BTC"), Some(&"bitcoin"));
        assert_eq!(map.get("ETH"), Some(&"ethereum"));
    }
}
