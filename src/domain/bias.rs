use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behavioral bias categories the bias detector checks for.
/// Thresholds live with the detector (application layer); only the taxonomy
/// and flag shape belong to the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    LossAversion,
    Overconfidence,
    Anchoring,
    Overexposure,
    RecencyBias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasFlag {
    pub kind: BiasKind,
    pub severity: BiasSeverity,
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

impl BiasFlag {
    pub fn new(kind: BiasKind, severity: BiasSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            detected_at: Utc::now(),
        }
    }

    /// Maps a bias flag to the guidance text shown alongside a signal.
    pub fn recommendation(&self) -> &'static str {
        match self.kind {
            BiasKind::LossAversion => {
                "recent losses detected; consider reducing position size or pausing entries"
            }
            BiasKind::Overconfidence => {
                "win streak detected; resist increasing position size beyond plan"
            }
            BiasKind::Anchoring => "entry price may be anchored to a stale reference level",
            BiasKind::Overexposure => "position size exceeds the recommended maximum allocation",
            BiasKind::RecencyBias => {
                "signal weighting may be overreacting to the most recent price action"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_is_nonempty_for_every_kind() {
        for kind in [
            BiasKind::LossAversion,
            BiasKind::Overconfidence,
            BiasKind::Anchoring,
            BiasKind::Overexposure,
            BiasKind::RecencyBias,
        ] {
            let flag = BiasFlag::new(kind, BiasSeverity::Low, "test");
            assert!(!flag.recommendation().is_empty());
        }
    }

    #[test]
    fn severity_orders_low_to_high() {
        assert!(BiasSeverity::Low < BiasSeverity::Medium);
        assert!(BiasSeverity::Medium < BiasSeverity::High);
    }
}
