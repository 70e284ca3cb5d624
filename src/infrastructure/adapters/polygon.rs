use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::info;

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;
use crate::domain::ports::Adapter;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::rate_limiter::RateLimiter;

const NAME: &str = "polygon";
const RATE_LIMIT_PER_MINUTE: u32 = 5;

pub struct PolygonAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PolygonAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE),
        }
    }
}

#[async_trait]
impl Adapter for PolygonAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn rate_limit_per_minute(&self) -> u32 {
        RATE_LIMIT_PER_MINUTE
    }

    async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError> {
        let today = Utc::now().date_naive();
        let start = today - chrono::Duration::days(5);
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

        let start_str = start.format("%Y-%m-%d").to_string();
        let end_str = end.format("%Y-%m-%d").to_string();
        let url = format!(
            "{}/v2/aggs/ticker/{symbol}/range/1/day/{start_str}/{end_str}",
            self.base_url
        );
        let url = build_url_with_query(
            &url,
            &[("adjusted", "true"), ("apiKey", self.api_key.as_str())],
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("polygon request failed: {e}")))?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("polygon response malformed: {e}"))
        })?;

        let results = body
            .get("results")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();

        let mut observations = Vec::new();
        for bar in results {
            let Some(ts_ms) = bar.get("t").and_then(|t| t.as_i64()) else {
                continue;
            };
            let Some(date) = Utc.timestamp_millis_opt(ts_ms).single().map(|d| d.date_naive())
            else {
                continue;
            };
            let field = |key: &str| -> Option<Decimal> {
                Decimal::from_f64(bar.get(key)?.as_f64()?)
            };
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field("o"),
                field("h"),
                field("l"),
                field("c"),
                field("v"),
            ) else {
                continue;
            };
            if let Ok(obs) = PriceObservation::new(symbol, date, open, high, low, close, volume, NAME) {
                observations.push(obs);
            }
        }

        info!(symbol, count = observations.len(), "polygon: fetched aggregates");
        Ok(observations)
    }

    async fn supported_symbols(&self) -> Result<Vec<String>, AppError> {
        Ok(vec![
            "SPY", "QQQ", "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX", "DIS",
            "JPM", "V", "MA", "WMT",
        ]
        .into_iter()
        .map(String::from)
        .collect())
    }
}
