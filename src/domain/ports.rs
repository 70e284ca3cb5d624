use async_trait::async_trait;
use chrono::NaiveDate;

use super::errors::AppError;
use super::observation::PriceObservation;

/// Common interface every market data provider implements. Adapters are
/// thin I/O shells; anything resembling business logic belongs above this
/// seam in the Router.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Maximum requests this adapter allows in a rolling 60s window.
    fn rate_limit_per_minute(&self) -> u32;

    async fn fetch_latest(&self, symbol: &str) -> Result<PriceObservation, AppError>;

    async fn fetch_historical(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceObservation>, AppError>;

    async fn supported_symbols(&self) -> Result<Vec<String>, AppError>;
}
