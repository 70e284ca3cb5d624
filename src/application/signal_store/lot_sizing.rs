#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    Crypto,
    Forex,
    Futures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotBucket {
    Standard,
    Mini,
    Micro,
}

#[derive(Debug, Clone)]
pub struct LotSizeCalculation {
    pub symbol: String,
    pub entry_price: f64,
    pub risk_amount_usd: f64,
    pub position_size_usd: f64,
    pub position_size_tokens: Option<f64>,
    pub position_size_units: Option<f64>,
    pub lot_size: Option<f64>,
    pub lot_bucket: Option<LotBucket>,
}

const STANDARD_LOT_UNITS: f64 = 100_000.0;
const MINI_LOT_UNITS: f64 = 10_000.0;
const MICRO_LOT_UNITS: f64 = 1_000.0;
const DEFAULT_PRICE_DIFF_FRACTION: f64 = 0.01;

fn lot_bucket_for(units: f64) -> (LotBucket, f64) {
    if units >= STANDARD_LOT_UNITS {
        (LotBucket::Standard, units / STANDARD_LOT_UNITS)
    } else if units >= MINI_LOT_UNITS {
        (LotBucket::Mini, units / MINI_LOT_UNITS)
    } else {
        (LotBucket::Micro, units / MICRO_LOT_UNITS)
    }
}

/// Sizes a position from account balance and per-trade risk, branching by
/// asset category per the original lot-size calculator (futures is treated
/// as forex for now, matching that source's documented simplification).
pub fn calculate(
    symbol: &str,
    entry_price: f64,
    stop_loss: f64,
    account_balance_usd: f64,
    risk_per_trade_pct: f64,
    category: AssetCategory,
) -> LotSizeCalculation {
    let risk_amount_usd = account_balance_usd * (risk_per_trade_pct / 100.0);
    let mut price_diff = (entry_price - stop_loss).abs();
    if price_diff == 0.0 {
        price_diff = entry_price * DEFAULT_PRICE_DIFF_FRACTION;
    }

    match category {
        AssetCategory::Crypto => {
            let tokens = risk_amount_usd / price_diff;
            LotSizeCalculation {
                symbol: symbol.to_string(),
                entry_price,
                risk_amount_usd,
                position_size_usd: tokens * entry_price,
                position_size_tokens: Some(tokens),
                position_size_units: None,
                lot_size: None,
                lot_bucket: None,
            }
        }
        AssetCategory::Forex | AssetCategory::Futures => {
            let units = risk_amount_usd / price_diff;
            let (bucket, lot_size) = lot_bucket_for(units);
            LotSizeCalculation {
                symbol: symbol.to_string(),
                entry_price,
                risk_amount_usd,
                position_size_usd: units * entry_price,
                position_size_tokens: None,
                position_size_units: Some(units),
                lot_size: Some(lot_size),
                lot_bucket: Some(bucket),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_sizing_computes_tokens_from_risk_over_price_diff() {
        let calc = calculate("BTC", 50_000.0, 49_000.0, 10_000.0, 1.0, AssetCategory::Crypto);
        assert!((calc.position_size_tokens.unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn zero_price_diff_falls_back_to_one_percent_of_entry() {
        let calc = calculate("BTC", 50_000.0, 50_000.0, 10_000.0, 1.0, AssetCategory::Crypto);
        let expected_tokens = 100.0 / (50_000.0 * 0.01);
        assert!((calc.position_size_tokens.unwrap() - expected_tokens).abs() < 1e-6);
    }

    #[test]
    fn forex_sizing_picks_the_standard_lot_bucket_above_100k_units() {
        let calc = calculate("EURUSD", 1.10, 1.095, 1_000_000.0, 1.0, AssetCategory::Forex);
        assert_eq!(calc.lot_bucket, Some(LotBucket::Standard));
    }

    #[test]
    fn forex_sizing_picks_the_micro_lot_bucket_for_small_accounts() {
        let calc = calculate("EURUSD", 1.10, 1.095, 1_000.0, 1.0, AssetCategory::Forex);
        assert_eq!(calc.lot_bucket, Some(LotBucket::Micro));
    }

    #[test]
    fn futures_is_sized_identically_to_forex() {
        let forex = calculate("ES", 5000.0, 4950.0, 50_000.0, 1.0, AssetCategory::Forex);
        let futures = calculate("ES", 5000.0, 4950.0, 50_000.0, 1.0, AssetCategory::Futures);
        assert_eq!(forex.position_size_units, futures.position_size_units);
    }
}
