use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;
use crate::domain::ports::Adapter;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::rate_limiter::RateLimiter;

const NAME: &str = "alphavantage";
const RATE_LIMIT_PER_MINUTE: u32 = 5;
/// 5 calls/minute free tier allows one call every 12s; enforced as a min
/// gap on top of the rolling-window limiter so bursts don't trip the API's
/// own per-second throttling.
const MIN_REQUEST_GAP: Duration = Duration::from_secs(12);

pub struct AlphaVantageAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl AlphaVantageAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            rate_limiter: RateLimiter::with_min_gap(RATE_LIMIT_PER_MINUTE, Some(MIN_REQUEST_GAP)),
        }
    }
}

#[async_trait]
impl Adapter for AlphaVantageAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn rate_limit_per_minute(&self) -> u32 {
        RATE_LIMIT_PER_MINUTE
    }

    async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError> {
        let mut obs = self
            .fetch_historical(symbol, NaiveDate::MIN, NaiveDate::MAX)
            .await?;
        obs.sort_by_key(|o| o.date);
        obs.pop()
            .ok_or_else(|| AppError::data_insufficient(format!("no data for {symbol}")))
    }

    async fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, AppError> {
        self.rate_limiter.acquire(NAME).await;

        let url = build_url_with_query(
            &self.base_url,
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", self.api_key.as_str()),
            ],
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("alphavantage request failed: {e}")))?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("alphavantage response malformed: {e}"))
        })?;

        if let Some(note) = body.get("Note").and_then(|n| n.as_str()) {
            return Err(AppError::UpstreamUnavailable(format!(
                "alphavantage throttled: {note}"
            )));
        }

        let series = body
            .get("Time Series (Daily)")
            .and_then(|s| s.as_object())
            .ok_or_else(|| AppError::data_insufficient(format!("no time series for {symbol}")))?;

        let mut observations = Vec::new();
        for (date_str, row) in series {
            let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            let field = |key: &str| -> Option<Decimal> {
                row.get(key)?.as_str()?.parse::<Decimal>().ok()
            };
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field("1. open"),
                field("2. high"),
                field("3. low"),
                field("4. close"),
                field("5. volume"),
            ) else {
                continue;
            };
            if let Ok(obs) = PriceObservation::new(symbol, date, open, high, low, close, volume, NAME) {
                observations.push(obs);
            }
        }

        info!(symbol, count = observations.len(), "alphavantage: fetched daily series");
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
