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

const NAME: &str = "binance";
const RATE_LIMIT_PER_MINUTE: u32 = 1200;

pub struct BinanceAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl BinanceAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url: base_url.into(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE),
        }
    }

    fn to_api_symbol(symbol: &str) -> String {
        if symbol.ends_with("USDT") {
            symbol.to_string()
        } else {
            format!("{symbol}USDT")
        }
    }

    fn parse_klines(symbol: &str, klines: Vec<serde_json::Value>) -> Vec<PriceObservation> {
        klines
            .into_iter()
            .filter_map(|k| {
                let arr = k.as_array()?;
                if arr.len() < 6 {
                    return None;
                }
                let ts_ms = arr[0].as_i64()?;
                let date = Utc.timestamp_millis_opt(ts_ms).single()?.date_naive();
                let open = Decimal::from_f64(arr[1].as_str()?.parse::<f64>().ok()?)?;
                let high = Decimal::from_f64(arr[2].as_str()?.parse::<f64>().ok()?)?;
                let low = Decimal::from_f64(arr[3].as_str()?.parse::<f64>().ok()?)?;
                let close = Decimal::from_f64(arr[4].as_str()?.parse::<f64>().ok()?)?;
                let volume = Decimal::from_f64(arr[5].as_str()?.parse::<f64>().ok()?)?;
                PriceObservation::new(symbol, date, open, high, low, close, volume, NAME).ok()
            })
            .collect()
    }
}

#[async_trait]
impl Adapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn rate_limit_per_minute(&self) -> u32 {
        RATE_LIMIT_PER_MINUTE
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

        let api_symbol = Self::to_api_symbol(symbol);
        let start_ms = start
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
            .to_string();
        let end_ms = end
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
            .timestamp_millis()
            .to_string();

        let url = format!("{}/api/v3/klines", self.base_url);
        let url = build_url_with_query(
            &url,
            &[
                ("symbol", api_symbol.as_str()),
                ("interval", "1d"),
                ("startTime", start_ms.as_str()),
                ("endTime", end_ms.as_str()),
                ("limit", "1000"),
            ],
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("binance request failed: {e}")))?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "binance klines fetch failed: {text}"
            )));
        }

        let klines: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("binance klines response malformed: {e}"))
        })?;

        let observations = Self::parse_klines(symbol, klines);
        info!(symbol, count = observations.len(), "binance: fetched candles");
        Ok(observations)
    }

    async fn supported_symbols(&self) -> Result<Vec<String>, AppError> {
        self.rate_limiter.acquire(NAME).await;

        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("binance exchangeInfo request failed: {e}"))
        })?;

        #[derive(serde::Deserialize)]
        struct ExchangeInfo {
            symbols: Vec<SymbolInfo>,
        }
        #[derive(serde::Deserialize)]
        struct SymbolInfo {
            symbol: String,
            status: String,
        }

        let info: ExchangeInfo = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("binance exchangeInfo malformed: {e}"))
        })?;

        Ok(info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING" && s.symbol.ends_with("USDT"))
            .map(|s| s.symbol.trim_end_matches("USDT").to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_usdt_suffix_when_missing() {
        assert_eq!(BinanceAdapter::to_api_symbol("BTC"), "BTCUSDT");
        assert_eq!(BinanceAdapter::to_api_symbol("ETHUSDT"), "ETHUSDT");
    }

    #[test]
    fn parses_well_formed_kline_rows() {
        let klines = vec![serde_json::json!([
            1704067200000i64,
            "100.0",
            "110.0",
            "95.0",
            "105.0",
            "10.0",
            1704153599999i64,
            "1050.0",
            100,
            "5.0",
            "525.0",
            "0"
        ])];
        let observations = BinanceAdapter::parse_klines("BTC", klines);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].symbol, "BTC");
        assert_eq!(observations[0].adapter, "binance");
    }

    #[test]
    fn skips_malformed_rows() {
        let klines = vec![serde_json::json!([1, 2, 3])];
        let observations = BinanceAdapter::parse_klines("BTC", klines);
        assert!(observations.is_empty());
    }
}
