use crate::application::router::Router;
use crate::application::signals::bias_detector::{self, TraderContext};
use crate::application::signals::engine;
use crate::domain::signal::{TradeCategory, TradingSignal};

/// Produces candidate signals across every category for a symbol, attaches
/// bias flags, drops any signal carrying a high-severity flag, and sorts the
/// survivors by confidence descending.
pub async fn generate_for_symbol(router: &Router, symbol: &str, ctx: &TraderContext) -> Vec<TradingSignal> {
    let mut candidates = Vec::new();
    for category in TradeCategory::ALL {
        if let Some(signal) = engine::generate(router, symbol, category).await {
            candidates.push(signal);
        }
    }

    let flags = bias_detector::detect_all(ctx);
    for signal in &mut candidates {
        signal.bias_flags = flags.clone();
    }

    let mut survivors: Vec<TradingSignal> = candidates
        .into_iter()
        .filter(|s| !s.has_high_severity_bias())
        .collect();
    survivors.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bias::{BiasFlag, BiasKind, BiasSeverity};
    use crate::domain::signal::{IndicatorBag, SignalSide, SignalStrength};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn signal_with_confidence(confidence: f64) -> TradingSignal {
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
            expiry: now + chrono::Duration::days(7),
            strength: SignalStrength::Strong,
            confidence,
            indicators: IndicatorBag::default(),
            bias_flags: Vec::new(),
            ai_enhancements: None,
        }
    }

    #[test]
    fn sorts_survivors_by_confidence_descending() {
        let mut signals = vec![signal_with_confidence(0.5), signal_with_confidence(0.9)];
        signals.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        assert_eq!(signals[0].confidence, 0.9);
    }

    #[test]
    fn high_severity_bias_flags_are_detected_by_has_high_severity_bias() {
        let mut signal = signal_with_confidence(0.8);
        signal.bias_flags = vec![BiasFlag::new(BiasKind::Anchoring, BiasSeverity::High, "test")];
        assert!(signal.has_high_severity_bias());
    }
}
