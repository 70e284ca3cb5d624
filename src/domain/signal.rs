use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bias::BiasFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalSide {
    Buy,
    Sell,
    Hold,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeCategory {
    Scalp,
    Intraday,
    Swing,
    LongTerm,
}

impl TradeCategory {
    pub const ALL: [TradeCategory; 4] = [
        TradeCategory::Scalp,
        TradeCategory::Intraday,
        TradeCategory::Swing,
        TradeCategory::LongTerm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TradeCategory::Scalp => "scalp",
            TradeCategory::Intraday => "intraday",
            TradeCategory::Swing => "swing",
            TradeCategory::LongTerm => "long_term",
        }
    }
}

impl std::str::FromStr for TradeCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scalp" => Ok(TradeCategory::Scalp),
            "intraday" => Ok(TradeCategory::Intraday),
            "swing" => Ok(TradeCategory::Swing),
            "long_term" | "longterm" => Ok(TradeCategory::LongTerm),
            other => anyhow::bail!("unknown trade category: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

/// Indicator bag attached to a signal, computed once per generation so the
/// bias detector and decision support don't need to recompute anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorBag {
    pub rsi_14: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub price_position: Option<f64>,
    pub realized_volatility: Option<f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub side: SignalSide,
    pub category: TradeCategory,
    pub entry: Decimal,
    pub tp: Decimal,
    pub sl: Decimal,
    pub tp_pct: f64,
    pub sl_pct: f64,
    pub risk_reward: f64,
    pub position_size_pct: f64,
    pub timestamp: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub strength: SignalStrength,
    pub confidence: f64,
    pub indicators: IndicatorBag,
    #[serde(default)]
    pub bias_flags: Vec<BiasFlag>,
    #[serde(default)]
    pub ai_enhancements: Option<HashMap<String, serde_json::Value>>,
}

impl TradingSignal {
    pub const MIN_POSITION_SIZE_PCT: f64 = 0.01;
    pub const MAX_POSITION_SIZE_PCT: f64 = 0.02;

    /// Not expired, R/R >= 1.0, and position size within [1%, 2%].
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
            && self.risk_reward >= 1.0
            && self.position_size_pct >= Self::MIN_POSITION_SIZE_PCT
            && self.position_size_pct <= Self::MAX_POSITION_SIZE_PCT
    }

    pub fn has_high_severity_bias(&self) -> bool {
        self.bias_flags
            .iter()
            .any(|f| f.severity == super::bias::BiasSeverity::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample_signal() -> TradingSignal {
        let now = Utc::now();
        TradingSignal {
            symbol: "ETH".into(),
            side: SignalSide::Buy,
            category: TradeCategory::Swing,
            entry: dec!(100),
            tp: dec!(106),
            sl: dec!(97),
            tp_pct: 6.0,
            sl_pct: 3.0,
            risk_reward: 2.0,
            position_size_pct: 0.015,
            timestamp: now,
            expiry: now + Duration::days(7),
            strength: SignalStrength::Strong,
            confidence: 0.7,
            indicators: IndicatorBag::default(),
            bias_flags: Vec::new(),
            ai_enhancements: None,
        }
    }

    #[test]
    fn valid_signal_passes_predicate() {
        let s = sample_signal();
        assert!(s.is_valid(Utc::now()));
    }

    #[test]
    fn expired_signal_is_invalid() {
        let mut s = sample_signal();
        s.expiry = Utc::now() - Duration::seconds(1);
        assert!(!s.is_valid(Utc::now()));
    }

    #[test]
    fn oversized_position_is_invalid() {
        let mut s = sample_signal();
        s.position_size_pct = 0.05;
        assert!(!s.is_valid(Utc::now()));
    }
}
