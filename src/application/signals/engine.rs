use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::application::router::Router;
use crate::application::signals::category::config_for;
use crate::application::signals::indicators;
use crate::domain::signal::{IndicatorBag, SignalSide, SignalStrength, TradeCategory, Trend, TradingSignal};

const MIN_RISK_REWARD: f64 = 1.5;
const MAX_POSITION_SIZE_PCT: f64 = 0.02;
const LOOKBACK_DAYS: i64 = 30;
const MIN_CANDLES: usize = 20;
const VOLATILITY_NORMALIZER: f64 = 0.3;
const VOLATILITY_FACTOR_CAP: f64 = 2.0;

/// Decides BUY/SELL/HOLD purely from the indicator bag, per the RSI ->
/// MACD+trend -> trend cascade.
fn decide_side(indicators: &IndicatorBag) -> SignalSide {
    if let Some(rsi) = indicators.rsi_14 {
        if rsi < 30.0 {
            return SignalSide::Buy;
        }
        if rsi > 70.0 {
            return SignalSide::Sell;
        }
    }
    if let Some(macd) = indicators.macd {
        if macd > 0.0 && indicators.trend == Trend::Up {
            return SignalSide::Buy;
        }
        if macd < 0.0 && indicators.trend == Trend::Down {
            return SignalSide::Sell;
        }
    }
    match indicators.trend {
        Trend::Up => SignalSide::Buy,
        Trend::Down => SignalSide::Sell,
        Trend::Neutral => SignalSide::Hold,
    }
}

fn tp_sl_pct(category: TradeCategory, volatility: Option<f64>) -> (f64, f64) {
    let config = config_for(category);
    let (tp_min, tp_max) = config.take_profit_pct;
    let (sl_min, sl_max) = config.stop_loss_pct;
    match volatility {
        Some(vol) => {
            let factor = (vol / VOLATILITY_NORMALIZER).min(VOLATILITY_FACTOR_CAP);
            let tp_pct = tp_min + (tp_max - tp_min) * factor * 0.5;
            let sl_pct = sl_min + (sl_max - sl_min) * factor * 0.5;
            (tp_pct, sl_pct)
        }
        None => ((tp_min + tp_max) / 2.0, (sl_min + sl_max) / 2.0),
    }
}

fn strength_from(indicators: &IndicatorBag, risk_reward: f64) -> SignalStrength {
    let mut confirmations = 0;
    if let Some(rsi) = indicators.rsi_14 {
        if rsi < 30.0 || rsi > 70.0 {
            confirmations += 1;
        }
    }
    if indicators.macd.map(|m| m != 0.0).unwrap_or(false) {
        confirmations += 1;
    }
    if indicators.trend != Trend::Neutral {
        confirmations += 1;
    }
    if risk_reward >= 2.0 {
        confirmations += 1;
    }

    match confirmations {
        n if n >= 3 => SignalStrength::VeryStrong,
        2 => SignalStrength::Strong,
        1 => SignalStrength::Moderate,
        _ => SignalStrength::Weak,
    }
}

fn confidence_from(indicators: &IndicatorBag, risk_reward: f64) -> f64 {
    let mut confidence: f64 = 0.5;
    if let Some(rsi) = indicators.rsi_14 {
        if rsi < 20.0 || rsi > 80.0 {
            confidence += 0.2;
        } else if rsi < 30.0 || rsi > 70.0 {
            confidence += 0.1;
        }
    }
    if risk_reward >= 3.0 {
        confidence += 0.2;
    } else if risk_reward >= 2.0 {
        confidence += 0.1;
    }
    if indicators.trend != Trend::Neutral {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

/// Generates a single candidate signal for (symbol, category), or `None`
/// when data is insufficient, the side resolves to HOLD, or risk/reward
/// fails the minimum threshold.
pub async fn generate(router: &Router, symbol: &str, category: TradeCategory) -> Option<TradingSignal> {
    let now = Utc::now();
    let end = now.date_naive();
    let start = end - chrono::Duration::days(LOOKBACK_DAYS);

    let observations = router.fetch_historical(symbol, start, end, None).await.ok()?;
    if observations.len() < MIN_CANDLES {
        return None;
    }
    let mut sorted = observations;
    sorted.sort_by_key(|o| o.date);

    let bag = indicators::compute(&sorted)?;
    let side = decide_side(&bag);
    if side == SignalSide::Hold {
        return None;
    }

    let entry = sorted.last()?.close;
    let entry_f64 = entry.to_f64()?;
    let (tp_pct, sl_pct) = tp_sl_pct(category, bag.realized_volatility);
    if sl_pct <= 0.0 {
        return None;
    }
    let risk_reward = tp_pct / sl_pct;
    if risk_reward < MIN_RISK_REWARD {
        return None;
    }

    let (tp_price, sl_price) = match side {
        SignalSide::Buy => (
            entry_f64 * (1.0 + tp_pct / 100.0),
            entry_f64 * (1.0 - sl_pct / 100.0),
        ),
        _ => (
            entry_f64 * (1.0 - tp_pct / 100.0),
            entry_f64 * (1.0 + sl_pct / 100.0),
        ),
    };

    let position_size_pct = MAX_POSITION_SIZE_PCT.min(sl_pct / 100.0);
    let strength = strength_from(&bag, risk_reward);
    let confidence = confidence_from(&bag, risk_reward);
    let config = config_for(category);

    Some(TradingSignal {
        symbol: symbol.to_string(),
        side,
        category,
        entry,
        tp: Decimal::from_f64(tp_price).unwrap_or(entry),
        sl: Decimal::from_f64(sl_price).unwrap_or(entry),
        tp_pct,
        sl_pct,
        risk_reward,
        position_size_pct,
        timestamp: now,
        expiry: now + config.max_horizon,
        strength,
        confidence,
        indicators: bag,
        bias_flags: Vec::new(),
        ai_enhancements: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_side_prefers_oversold_rsi_over_trend() {
        let bag = IndicatorBag {
            rsi_14: Some(25.0),
            trend: Trend::Down,
            ..Default::default()
        };
        assert_eq!(decide_side(&bag), SignalSide::Buy);
    }

    #[test]
    fn decide_side_falls_back_to_trend_when_rsi_is_neutral() {
        let bag = IndicatorBag {
            rsi_14: Some(50.0),
            trend: Trend::Down,
            ..Default::default()
        };
        assert_eq!(decide_side(&bag), SignalSide::Sell);
    }

    #[test]
    fn strength_counts_four_confirmations_as_very_strong() {
        let bag = IndicatorBag {
            rsi_14: Some(15.0),
            macd: Some(1.0),
            trend: Trend::Up,
            ..Default::default()
        };
        assert_eq!(strength_from(&bag, 2.5), SignalStrength::VeryStrong);
    }

    #[test]
    fn confidence_clamps_at_one() {
        let bag = IndicatorBag {
            rsi_14: Some(5.0),
            trend: Trend::Up,
            ..Default::default()
        };
        assert!(confidence_from(&bag, 5.0) <= 1.0);
    }

}
