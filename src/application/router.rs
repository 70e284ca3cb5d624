use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::errors::AppError;
use crate::domain::observation::PriceObservation;
use crate::domain::ports::Adapter;
use crate::infrastructure::cache::DataCache;
use crate::infrastructure::store::Store;

const WELL_KNOWN_CRYPTO: [&str; 15] = [
    "BTC", "ETH", "SOL", "BNB", "ADA", "AVAX", "MATIC", "DOT", "LINK", "UNI", "ATOM", "ALGO",
    "XRP", "DOGE", "SHIB",
];

const CRYPTO_PRIORITY: [&str; 3] = ["binance", "coingecko", "coinmarketcap"];
const DEFAULT_ADAPTER: &str = "yahoofinance";

/// Coverage above this fraction of the requested window's calendar days is
/// considered "already have it" and skips a refetch.
const COVERAGE_THRESHOLD: f64 = 0.80;

/// Single entry point for data consumers: resolves which adapter serves a
/// symbol, mediates through Cache and Store, and write-throughs results.
pub struct Router {
    adapters: HashMap<&'static str, Arc<dyn Adapter>>,
    cache: Arc<DataCache>,
    store: Arc<Store>,
}

impl Router {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>, cache: Arc<DataCache>, store: Arc<Store>) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.name(), a)).collect();
        Self {
            adapters,
            cache,
            store,
        }
    }

    fn resolve_adapter_order(&self, symbol: &str, prefer: Option<&str>) -> Vec<&'static str> {
        if let Some(prefer) = prefer {
            if self.adapters.contains_key(prefer) {
                return vec![self
                    .adapters
                    .get_key_value(prefer)
                    .map(|(k, _)| *k)
                    .unwrap()];
            }
        }

        if WELL_KNOWN_CRYPTO.contains(&symbol) {
            CRYPTO_PRIORITY
                .iter()
                .copied()
                .filter(|name| self.adapters.contains_key(name))
                .collect()
        } else if self.adapters.contains_key(DEFAULT_ADAPTER) {
            vec![DEFAULT_ADAPTER]
        } else {
            Vec::new()
        }
    }

    pub async fn fetch_price(
        &self,
        symbol: &str,
        prefer: Option<&str>,
    ) -> Result<Option<PriceObservation>, AppError> {
        let today = chrono::Utc::now().date_naive();
        for adapter_name in self.resolve_adapter_order(symbol, prefer) {
            if let Some(cached) = self.cache.get(adapter_name, symbol, today) {
                return Ok(Some(cached));
            }

            let Some(adapter) = self.adapters.get(adapter_name) else {
                continue;
            };

            match adapter.fetch_latest(symbol).await {
                Ok(obs) => {
                    self.cache.put(obs.clone());
                    return Ok(Some(obs));
                }
                Err(e) => {
                    warn!(symbol, adapter = adapter_name, error = %e, "router: fetch_price failed, trying next adapter");
                }
            }
        }
        Ok(None)
    }

    pub async fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        prefer: Option<&str>,
    ) -> Result<Vec<PriceObservation>, AppError> {
        for adapter_name in self.resolve_adapter_order(symbol, prefer) {
            let coverage = self
                .store
                .coverage_ratio(symbol, start, end)
                .await
                .unwrap_or(0.0);

            if coverage >= COVERAGE_THRESHOLD {
                return self.store.get_prices(symbol, Some(start), Some(end), None).await;
            }

            let Some(adapter) = self.adapters.get(adapter_name) else {
                continue;
            };

            match adapter.fetch_historical(symbol, start, end).await {
                Ok(observations) if !observations.is_empty() => {
                    self.store.store_observations(&observations).await?;
                    return Ok(observations);
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(symbol, adapter = adapter_name, error = %e, "router: fetch_historical failed, trying next adapter");
                }
            }
        }

        self.store.get_prices(symbol, Some(start), Some(end), None).await
    }

    pub fn symbols(&self) -> Vec<&'static str> {
        self.adapters.keys().copied().collect()
    }

    pub fn cache(&self) -> &Arc<DataCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAdapter {
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl Adapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn rate_limit_per_minute(&self) -> u32 {
            60
        }

        async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError> {
            PriceObservation::new(
                symbol,
                chrono::Utc::now().date_naive(),
                rust_decimal_macros::dec!(1),
                rust_decimal_macros::dec!(1),
                rust_decimal_macros::dec!(1),
                rust_decimal_macros::dec!(1),
                rust_decimal_macros::dec!(1),
                self.name,
            )
        }

        async fn fetch_historical(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceObservation>, AppError> {
            Ok(Vec::new())
        }

        async fn supported_symbols(&self) -> Result<Vec<String>, AppError> {
            Ok(Vec::new())
        }
    }

    async fn router_with(names: &[&'static str]) -> Router {
        let adapters: Vec<Arc<dyn Adapter>> = names
            .iter()
            .map(|n| Arc::new(StubAdapter { name: n }) as Arc<dyn Adapter>)
            .collect();
        let cache = Arc::new(DataCache::new(300));
        let store = Arc::new(Store::new("sqlite::memory:").await.unwrap());
        Router::new(adapters, cache, store)
    }

    #[tokio::test]
    async fn crypto_symbol_prefers_binance_first() {
        let router = router_with(&["coingecko", "binance"]).await;
        let order = router.resolve_adapter_order("BTC", None);
        assert_eq!(order.first(), Some(&"binance"));
    }

    #[tokio::test]
    async fn non_crypto_symbol_defaults_to_yahoofinance() {
        let router = router_with(&["yahoofinance", "binance"]).await;
        let order = router.resolve_adapter_order("AAPL", None);
        assert_eq!(order, vec!["yahoofinance"]);
    }

    #[tokio::test]
    async fn explicit_preference_wins_when_available() {
        let router = router_with(&["coingecko", "binance"]).await;
        let order = router.resolve_adapter_order("BTC", Some("coingecko"));
        assert_eq!(order, vec!["coingecko"]);
    }

    #[tokio::test]
    async fn fetch_price_returns_observation_from_first_available_adapter() {
        let router = router_with(&["binance"]).await;
        let result = router.fetch_price("BTC", None).await.unwrap();
        assert!(result.is_some());
    }
}
