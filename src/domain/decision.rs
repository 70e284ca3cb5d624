use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Executed,
    Rejected,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Profit,
    Loss,
    Pending,
}

/// Append-only decision-support record. Mutated only by `record_outcome`,
/// keyed on (symbol, signal_timestamp) per the persistence model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLog {
    pub symbol: String,
    pub signal_timestamp: DateTime<Utc>,
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub decision: ExecutionState,
    pub execution_price: Option<Decimal>,
    pub outcome: Outcome,
    pub pnl_btc: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl DecisionLog {
    pub fn new(
        symbol: impl Into<String>,
        signal_timestamp: DateTime<Utc>,
        recommendation: Recommendation,
        risk_level: RiskLevel,
        confidence: f64,
        rationale: Vec<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            signal_timestamp,
            recommendation,
            risk_level,
            confidence: confidence.clamp(0.0, 1.0),
            rationale,
            decision: ExecutionState::Pending,
            execution_price: None,
            outcome: Outcome::Pending,
            pnl_btc: None,
            pnl_pct: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> (String, DateTime<Utc>) {
        (self.symbol.clone(), self.signal_timestamp)
    }

    pub fn record_execution(&mut self, price: Decimal) {
        self.decision = ExecutionState::Executed;
        self.execution_price = Some(price);
    }

    pub fn record_outcome(&mut self, pnl_btc: f64, pnl_pct: f64) {
        self.outcome = if pnl_btc >= 0.0 { Outcome::Profit } else { Outcome::Loss };
        self.pnl_btc = Some(pnl_btc);
        self.pnl_pct = Some(pnl_pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecisionLog {
        DecisionLog::new(
            "BTC",
            Utc::now(),
            Recommendation::Hold,
            RiskLevel::High,
            1.4,
            vec!["elevated volatility".to_string()],
        )
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        assert_eq!(sample().confidence, 1.0);
    }

    #[test]
    fn new_log_starts_pending() {
        let log = sample();
        assert_eq!(log.decision, ExecutionState::Pending);
        assert_eq!(log.outcome, Outcome::Pending);
    }

    #[test]
    fn recording_a_negative_outcome_marks_it_a_loss() {
        let mut log = sample();
        log.record_outcome(-0.01, -2.5);
        assert_eq!(log.outcome, Outcome::Loss);
    }
}
