use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::warn;

use crate::application::router::Router;

const BTC_SYMBOL: &str = "BTC";
const BTC_PREFERRED_ADAPTERS: [&str; 3] = ["binance", "coingecko", "yahoofinance"];

/// Unifies heterogeneous asset values under a BTC numeraire. Every
/// conversion degrades to `None`/0.0 with a warning on missing data rather
/// than failing the caller (Design Notes: "Cache and Store ... degrade").
pub struct BtcConverter<'a> {
    router: &'a Router,
}

impl<'a> BtcConverter<'a> {
    pub fn new(router: &'a Router) -> Self {
        Self { router }
    }

    pub async fn btc_price(&self) -> Option<f64> {
        for adapter in BTC_PREFERRED_ADAPTERS {
            if let Ok(Some(obs)) = self.router.fetch_price(BTC_SYMBOL, Some(adapter)).await {
                return obs.close.to_f64();
            }
        }
        match self.router.fetch_price(BTC_SYMBOL, None).await {
            Ok(Some(obs)) => obs.close.to_f64(),
            _ => {
                warn!("btc_converter: could not resolve BTC price from any adapter");
                None
            }
        }
    }

    async fn price_of(&self, symbol: &str) -> Option<f64> {
        match self.router.fetch_price(symbol, None).await {
            Ok(Some(obs)) => obs.close.to_f64(),
            _ => None,
        }
    }

    pub async fn to_btc(&self, amount: f64, symbol: &str) -> Option<f64> {
        if symbol.eq_ignore_ascii_case(BTC_SYMBOL) {
            return Some(amount);
        }
        let asset_price = self.price_of(symbol).await?;
        let btc_price = self.btc_price().await?;
        if btc_price == 0.0 {
            return None;
        }
        Some(amount * asset_price / btc_price)
    }

    pub async fn from_btc(&self, btc_amount: f64, target_symbol: &str) -> Option<f64> {
        if target_symbol.eq_ignore_ascii_case(BTC_SYMBOL) {
            return Some(btc_amount);
        }
        let btc_price = self.btc_price().await?;
        let target_price = self.price_of(target_symbol).await?;
        if target_price == 0.0 {
            return None;
        }
        Some(btc_amount * btc_price / target_price)
    }

    /// Converts every holding to BTC; unconvertible symbols contribute 0.0
    /// and a warning rather than failing the whole portfolio.
    pub async fn portfolio_to_btc(&self, holdings: &HashMap<String, f64>) -> (HashMap<String, f64>, f64) {
        let mut btc_holdings = HashMap::new();
        let mut total = 0.0;
        for (symbol, amount) in holdings {
            match self.to_btc(*amount, symbol).await {
                Some(value) => {
                    btc_holdings.insert(symbol.clone(), value);
                    total += value;
                }
                None => {
                    warn!(symbol, "btc_converter: could not convert holding to BTC");
                    btc_holdings.insert(symbol.clone(), 0.0);
                }
            }
        }
        (btc_holdings, total)
    }

    pub async fn btc_allocation(&self, holdings: &HashMap<String, f64>) -> f64 {
        let (btc_holdings, total) = self.portfolio_to_btc(holdings).await;
        if total == 0.0 {
            return 0.0;
        }
        btc_holdings.get(BTC_SYMBOL).copied().unwrap_or(0.0) / total
    }

    /// Asset close series divided by BTC close series on aligned dates,
    /// then first-differenced as a percentage change.
    pub async fn asset_returns_in_btc(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<f64> {
        let asset_obs = self
            .router
            .fetch_historical(symbol, start, end, None)
            .await
            .unwrap_or_default();
        let btc_obs = self
            .router
            .fetch_historical(BTC_SYMBOL, start, end, None)
            .await
            .unwrap_or_default();

        let btc_by_date: HashMap<NaiveDate, Decimal> =
            btc_obs.into_iter().map(|o| (o.date, o.close)).collect();

        let mut ratios: Vec<(NaiveDate, f64)> = asset_obs
            .into_iter()
            .filter_map(|o| {
                let btc_close = btc_by_date.get(&o.date)?;
                if btc_close.is_zero() {
                    return None;
                }
                Some((o.date, (o.close / btc_close).to_f64()?))
            })
            .collect();
        ratios.sort_by_key(|(date, _)| *date);

        ratios
            .windows(2)
            .filter_map(|w| {
                let (_, prev) = w[0];
                let (_, curr) = w[1];
                if prev == 0.0 {
                    None
                } else {
                    Some((curr - prev) / prev)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_btc_identity_for_btc_symbol_does_not_require_a_router() {
        // covered indirectly via integration tests that construct a Router;
        // this module has no pure-function surface beyond the identity check.
        assert!("BTC".eq_ignore_ascii_case(BTC_SYMBOL));
    }
}
