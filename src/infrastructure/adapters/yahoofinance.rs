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

const NAME: &str = "yahoofinance";
const RATE_LIMIT_PER_MINUTE: u32 = 200;

const CRYPTO_SYMBOLS: [&str; 5] = ["BTC", "ETH", "SOL", "BNB", "ADA"];

pub struct YahooFinanceAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl YahooFinanceAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE),
        }
    }

    fn normalize_symbol(symbol: &str) -> String {
        if CRYPTO_SYMBOLS.contains(&symbol) {
            format!("{symbol}-USD")
        } else {
            symbol.to_string()
        }
    }
}

#[async_trait]
impl Adapter for YahooFinanceAdapter {
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

        let ticker = Self::normalize_symbol(symbol);
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp()
            .to_string();
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
            .timestamp()
            .to_string();

        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        let url = build_url_with_query(
            &url,
            &[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
            ],
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("yahoofinance request failed: {e}")))?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "yahoofinance chart fetch failed: {text}"
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("yahoofinance chart response malformed: {e}"))
        })?;

        let result = body
            .pointer("/chart/result/0")
            .ok_or_else(|| AppError::data_insufficient(format!("no chart data for {symbol}")))?;

        let timestamps = result
            .get("timestamp")
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();
        let quote = result.pointer("/indicators/quote/0");

        let field = |name: &str, i: usize| -> Option<f64> {
            quote?.get(name)?.as_array()?.get(i)?.as_f64()
        };

        let mut observations = Vec::new();
        for (i, ts) in timestamps.iter().enumerate() {
            let Some(ts) = ts.as_i64() else { continue };
            let Some(date) = Utc.timestamp_opt(ts, 0).single().map(|d| d.date_naive()) else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field("open", i),
                field("high", i),
                field("low", i),
                field("close", i),
                field("volume", i),
            ) else {
                continue;
            };
            let Some(obs) = PriceObservation::new(
                symbol,
                date,
                Decimal::from_f64(open).unwrap_or(Decimal::ZERO),
                Decimal::from_f64(high).unwrap_or(Decimal::ZERO),
                Decimal::from_f64(low).unwrap_or(Decimal::ZERO),
                Decimal::from_f64(close).unwrap_or(Decimal::ZERO),
                Decimal::from_f64(volume).unwrap_or(Decimal::ZERO),
                NAME,
            )
            .ok() else {
                continue;
            };
            observations.push(obs);
        }

        info!(symbol, count = observations.len(), "yahoofinance: fetched chart");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_crypto_symbols() {
        assert_eq!(YahooFinanceAdapter::normalize_symbol("BTC"), "BTC-USD");
        assert_eq!(YahooFinanceAdapter::normalize_symbol("AAPL"), "AAPL");
    }
}
