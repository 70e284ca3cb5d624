use rust_decimal::prelude::ToPrimitive;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};

use crate::domain::observation::PriceObservation;
use crate::domain::signal::{IndicatorBag, Trend};

const TRADING_DAYS: f64 = 252.0;

/// Simple moving average over the trailing `period` closes, `None` if the
/// window isn't fully covered. Delegates to `ta`, matching the teacher's
/// `SimpleMovingAverage::new(period)` + sequential `.next()` usage
/// (`analyst.rs`).
fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    let mut indicator = SimpleMovingAverage::new(period).ok()?;
    let window = &closes[closes.len() - period..];
    let mut current = 0.0;
    for &price in window {
        current = indicator.next(price);
    }
    Some(current)
}

/// Exponential moving average seeded at the first observation. `ta`'s
/// `ExponentialMovingAverage` seeds the same way (its first `.next()` call
/// returns the input unchanged), so feeding it the whole window
/// sequentially reproduces the original's running update exactly.
fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    let mut indicator = ExponentialMovingAverage::new(period).ok()?;
    let mut current = 0.0;
    for &price in closes {
        current = indicator.next(price);
    }
    Some(current)
}

/// Hand-rolled rather than `ta::indicators::RelativeStrengthIndex`: the
/// original computes RSI from a plain average of gains/losses over the
/// window, while `ta`'s RSI applies Wilder smoothing and would not
/// reproduce the fixed RSI(14)=25 determinism case the signal engine is
/// tested against.
fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - period..];
    let avg_gain = tail.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
    let avg_loss = tail.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

fn price_position(closes: &[f64]) -> Option<f64> {
    let current = *closes.last()?;
    let high = closes.iter().cloned().fold(f64::MIN, f64::max);
    let low = closes.iter().cloned().fold(f64::MAX, f64::min);
    if high > low {
        Some((current - low) / (high - low))
    } else {
        Some(0.5)
    }
}

fn realized_volatility(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }
    let returns: Vec<f64> = closes
        .windows(2)
        .filter_map(|w| if w[0] != 0.0 { Some((w[1] - w[0]) / w[0]) } else { None })
        .collect();
    if returns.is_empty() {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    Some(variance.sqrt() * TRADING_DAYS.sqrt())
}

/// Builds the full indicator bag from a chronologically ordered window of
/// daily candles (oldest first). Requires at least 20 candles.
pub fn compute(observations: &[PriceObservation]) -> Option<IndicatorBag> {
    if observations.len() < 20 {
        return None;
    }
    let closes: Vec<f64> = observations.iter().filter_map(|o| o.close.to_f64()).collect();
    if closes.len() < 20 {
        return None;
    }

    let sma_20 = sma(&closes, 20);
    let sma_50 = sma(&closes, 50);
    let ema_12 = ema(&closes, 12);
    let ema_26 = ema(&closes, 26);
    let macd = match (ema_12, ema_26) {
        (Some(fast), Some(slow)) => Some(fast - slow),
        _ => None,
    };
    let trend = match (sma_20, sma_50) {
        (Some(s20), Some(s50)) if s20 > s50 => Trend::Up,
        (Some(s20), Some(s50)) if s20 < s50 => Trend::Down,
        (Some(_), Some(_)) => Trend::Neutral,
        _ => Trend::Neutral,
    };

    Some(IndicatorBag {
        rsi_14: rsi(&closes, 14),
        sma_20,
        sma_50,
        ema_12,
        ema_26,
        macd,
        price_position: price_position(&closes),
        realized_volatility: realized_volatility(&closes),
        trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn candle(day_offset: i64, close: f64) -> PriceObservation {
        PriceObservation {
            symbol: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day_offset),
            open: Decimal::try_from(close).unwrap(),
            high: Decimal::try_from(close * 1.01).unwrap(),
            low: Decimal::try_from(close * 0.99).unwrap(),
            close: Decimal::try_from(close).unwrap(),
            volume: Decimal::ONE,
            adapter: "test".into(),
        }
    }

    fn rising_series(n: i64) -> Vec<PriceObservation> {
        (1..=n).map(|d| candle(d, 100.0 + d as f64)).collect()
    }

    #[test]
    fn returns_none_below_twenty_candles() {
        assert!(compute(&rising_series(10)).is_none());
    }

    #[test]
    fn rising_prices_yield_an_uptrend() {
        let bag = compute(&rising_series(60)).unwrap();
        assert_eq!(bag.trend, Trend::Up);
        assert!(bag.rsi_14.unwrap() > 50.0);
    }

    #[test]
    fn price_position_is_one_at_the_series_high() {
        let bag = compute(&rising_series(25)).unwrap();
        assert!((bag.price_position.unwrap() - 1.0).abs() < 1e-9);
    }
}
