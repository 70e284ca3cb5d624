use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::warn;

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;
use crate::domain::ports::Adapter;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::rate_limiter::RateLimiter;

const NAME: &str = "coinmarketcap";
const RATE_LIMIT_PER_MINUTE: u32 = 10;

pub struct CoinMarketCapAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
    symbol_map: RwLock<Option<HashMap<String, u64>>>,
}

impl CoinMarketCapAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE),
            symbol_map: RwLock::new(None),
        }
    }

    async fn symbol_to_id(&self, symbol: &str) -> Result<u64, AppError> {
        if let Some(map) = self.symbol_map.read().expect("lock poisoned").as_ref() {
            if let Some(id) = map.get(symbol) {
                return Ok(*id);
            }
        }

        let url = format!("{}/v1/cryptocurrency/map", self.base_url);
        let url = build_url_with_query(&url, &[("listing_status", "active"), ("limit", "5000")]);
        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("coinmarketcap map request failed: {e}")))?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("coinmarketcap map response malformed: {e}"))
        })?;

        let mut map = HashMap::new();
        if let Some(entries) = body.get("data").and_then(|d| d.as_array()) {
            for coin in entries {
                let sym = coin.get("symbol").and_then(|s| s.as_str());
                let id = coin.get("id").and_then(|i| i.as_u64());
                if let (Some(sym), Some(id)) = (sym, id) {
                    map.entry(sym.to_uppercase()).or_insert(id);
                }
            }
        }

        let id = map
            .get(symbol)
            .copied()
            .ok_or_else(|| AppError::data_insufficient(format!("{symbol} not found in coinmarketcap")))?;
        *self.symbol_map.write().expect("lock poisoned") = Some(map);
        Ok(id)
    }
}

#[async_trait]
impl Adapter for CoinMarketCapAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn rate_limit_per_minute(&self) -> u32 {
        RATE_LIMIT_PER_MINUTE
    }

    async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError> {
        self.rate_limiter.acquire(NAME).await;
        let coin_id = self.symbol_to_id(symbol).await?;

        let url = format!("{}/v1/cryptocurrency/quotes/latest", self.base_url);
        let coin_id_str = coin_id.to_string();
        let url = build_url_with_query(&url, &[("id", coin_id_str.as_str())]);
        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("coinmarketcap quote request failed: {e}")))?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("coinmarketcap quote response malformed: {e}"))
        })?;

        let price = body
            .get("data")
            .and_then(|d| d.get(coin_id.to_string()))
            .and_then(|c| c.get("quote"))
            .and_then(|q| q.get("USD"))
            .and_then(|usd| usd.get("price"))
            .and_then(|p| p.as_f64())
            .ok_or_else(|| AppError::data_insufficient(format!("no quote for {symbol}")))?;

        let price = Decimal::from_f64(price)
            .ok_or_else(|| AppError::Internal("non-finite price from coinmarketcap".into()))?;
        let today = Utc::now().date_naive();
        PriceObservation::new(symbol, today, price, price, price, price, Decimal::ZERO, NAME)
    }

    /// CoinMarketCap's historical quotes endpoint requires a paid plan; the
    /// free-tier map/quotes-latest pair this adapter uses cannot serve it.
    async fn fetch_historical(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, AppError> {
        warn!(symbol, "coinmarketcap: historical quotes require a paid plan");
        Err(AppError::data_insufficient(
            "coinmarketcap historical data requires a paid plan".to_string(),
        ))
    }

    async fn supported_symbols(&self) -> Result<Vec<String>, AppError> {
        Ok(vec![
            "BTC", "ETH", "BNB", "SOL", "ADA", "XRP", "DOGE", "DOT", "MATIC", "AVAX", "LINK",
            "UNI", "ATOM", "ALGO", "LTC", "SHIB",
        ]
        .into_iter()
        .map(String::from)
        .collect())
    }
}
