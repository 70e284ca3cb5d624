use crate::domain::decision::{DecisionLog, Recommendation, RiskLevel};
use crate::domain::signal::{SignalStrength, TradeCategory, TradingSignal};

const HIGH_RISK_SEVERITY_MULTIPLIER: f64 = 0.7;
const MEDIUM_RISK_SEVERITY_MULTIPLIER: f64 = 0.9;
const LOW_RISK_SEVERITY_MULTIPLIER: f64 = 1.0;
const WARNING_PENALTY_PER_FLAG: f64 = 0.1;

/// Scores a signal's risk level from position size, risk/reward, stop-loss
/// width, category, and confidence; thresholds at >=5 high, >=3 medium.
fn assess_risk_level(signal: &TradingSignal) -> RiskLevel {
    let mut score = 0;

    if signal.position_size_pct > 0.02 {
        score += 2;
    } else if signal.position_size_pct > 0.015 {
        score += 1;
    }

    if signal.risk_reward < 1.5 {
        score += 2;
    } else if signal.risk_reward < 2.0 {
        score += 1;
    }

    if signal.sl_pct > 5.0 {
        score += 1;
    }

    match signal.category {
        TradeCategory::Scalp => score += 2,
        TradeCategory::Intraday => score += 1,
        _ => {}
    }

    if signal.confidence < 0.5 {
        score += 1;
    }

    if score >= 5 {
        RiskLevel::High
    } else if score >= 3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn determine_recommendation(signal: &TradingSignal, risk_level: RiskLevel, warning_count: usize) -> Recommendation {
    if warning_count >= 2 {
        return Recommendation::Avoid;
    }
    if risk_level == RiskLevel::High {
        return if signal.confidence < 0.6 {
            Recommendation::Avoid
        } else {
            Recommendation::Hold
        };
    }
    if signal.strength == SignalStrength::VeryStrong && signal.confidence >= 0.8 {
        return Recommendation::StrongBuy;
    }
    if matches!(signal.strength, SignalStrength::Strong | SignalStrength::VeryStrong) && signal.confidence >= 0.6 {
        return Recommendation::Buy;
    }
    if signal.strength == SignalStrength::Moderate {
        return Recommendation::Hold;
    }
    Recommendation::Avoid
}

fn final_confidence(signal: &TradingSignal, risk_level: RiskLevel, warning_count: usize) -> f64 {
    let risk_multiplier = match risk_level {
        RiskLevel::High => HIGH_RISK_SEVERITY_MULTIPLIER,
        RiskLevel::Medium => MEDIUM_RISK_SEVERITY_MULTIPLIER,
        RiskLevel::Low => LOW_RISK_SEVERITY_MULTIPLIER,
    };
    let warning_multiplier = (1.0 - WARNING_PENALTY_PER_FLAG * warning_count as f64).max(0.0);
    (signal.confidence * risk_multiplier * warning_multiplier).clamp(0.0, 1.0)
}

fn rationale_for(signal: &TradingSignal, risk_level: RiskLevel, warning_count: usize) -> Vec<String> {
    let mut rationale = vec![
        format!("signal strength: {:?}", signal.strength),
        format!("confidence: {:.0}%", signal.confidence * 100.0),
        format!("risk/reward ratio: {:.2}", signal.risk_reward),
        format!("risk level: {:?}", risk_level),
        format!("trade category: {}", signal.category.as_str()),
    ];
    if warning_count > 0 {
        rationale.push(format!("bias warnings: {warning_count}"));
    }
    rationale
}

/// Evaluates a signal against the risk/recommendation rubric and produces a
/// pending `DecisionLog`. An invalid signal (expired, low R/R, bad size)
/// always resolves to a zero-confidence AVOID.
pub fn analyze_signal(signal: &TradingSignal, now: chrono::DateTime<chrono::Utc>) -> DecisionLog {
    if !signal.is_valid(now) {
        return DecisionLog::new(
            signal.symbol.clone(),
            signal.timestamp,
            Recommendation::Avoid,
            RiskLevel::High,
            0.0,
            vec!["signal is not valid (expired, low R/R, or invalid position size)".to_string()],
        );
    }

    let warning_count = signal.bias_flags.len();
    let risk_level = assess_risk_level(signal);
    let recommendation = determine_recommendation(signal, risk_level, warning_count);
    let confidence = final_confidence(signal, risk_level, warning_count);
    let rationale = rationale_for(signal, risk_level, warning_count);

    DecisionLog::new(
        signal.symbol.clone(),
        signal.timestamp,
        recommendation,
        risk_level,
        confidence,
        rationale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{IndicatorBag, SignalSide};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_signal(strength: SignalStrength, confidence: f64) -> TradingSignal {
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
            risk_reward: 2.5,
            position_size_pct: 0.018,
            timestamp: now,
            expiry: now + chrono::Duration::days(7),
            strength,
            confidence,
            indicators: IndicatorBag::default(),
            bias_flags: Vec::new(),
            ai_enhancements: None,
        }
    }

    #[test]
    fn strong_signal_with_no_bias_is_strong_buy() {
        let signal = sample_signal(SignalStrength::VeryStrong, 0.85);
        let log = analyze_signal(&signal, Utc::now());
        assert_eq!(log.recommendation, Recommendation::StrongBuy);
    }

    #[test]
    fn same_signal_with_a_high_severity_bias_is_avoid() {
        use crate::domain::bias::{BiasFlag, BiasKind, BiasSeverity};
        let mut signal = sample_signal(SignalStrength::VeryStrong, 0.85);
        signal.bias_flags = vec![
            BiasFlag::new(BiasKind::Anchoring, BiasSeverity::High, "oversized"),
            BiasFlag::new(BiasKind::Overconfidence, BiasSeverity::Medium, "win streak"),
        ];
        let log = analyze_signal(&signal, Utc::now());
        assert_eq!(log.recommendation, Recommendation::Avoid);
    }

    #[test]
    fn expired_signal_is_always_avoid_with_zero_confidence() {
        let mut signal = sample_signal(SignalStrength::VeryStrong, 0.9);
        signal.expiry = Utc::now() - chrono::Duration::seconds(1);
        let log = analyze_signal(&signal, Utc::now());
        assert_eq!(log.recommendation, Recommendation::Avoid);
        assert_eq!(log.confidence, 0.0);
    }

    #[test]
    fn moderate_strength_yields_hold() {
        let signal = sample_signal(SignalStrength::Moderate, 0.65);
        let log = analyze_signal(&signal, Utc::now());
        assert_eq!(log.recommendation, Recommendation::Hold);
    }
}
