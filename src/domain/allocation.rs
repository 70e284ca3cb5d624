use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One asset's standing within its class: actual vs. target share of the
/// portfolio, with the target distributed within the class for assets that
/// have no explicit override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub symbol: String,
    pub current_value: Decimal,
    pub current_pct: f64,
    pub target_pct: f64,
    pub target_value: Decimal,
    pub diff: Decimal,
    pub diff_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingAction {
    pub symbol: String,
    pub action: RebalanceDirection,
    pub amount: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceDirection {
    Buy,
    Sell,
}

/// One asset class's standing (stocks, crypto, ...) against its target mix,
/// plus the assets held within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetClassAllocation {
    pub asset_class: String,
    pub current_value: Decimal,
    pub current_pct: f64,
    pub target_pct: f64,
    pub target_value: Decimal,
    pub diff: Decimal,
    pub diff_pct: f64,
    pub assets: Vec<AssetAllocation>,
}

/// Full allocation snapshot for one account: per-class standing with
/// nested per-asset detail, total drift across classes, and the
/// rebalancing actions needed to bring drifted classes back to target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub total_value: Decimal,
    pub asset_classes: Vec<AssetClassAllocation>,
    pub total_drift: f64,
    pub needs_rebalancing: bool,
    pub rebalancing_threshold: f64,
    pub rebalancing_actions: Vec<RebalancingAction>,
}

impl AllocationReport {
    /// Classes drifted beyond the given tolerance (percentage points).
    pub fn drifted_classes(&self, tolerance_pct: f64) -> Vec<&AssetClassAllocation> {
        self.asset_classes
            .iter()
            .filter(|c| c.diff_pct.abs() > tolerance_pct)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn class(asset_class: &str, diff_pct: f64) -> AssetClassAllocation {
        AssetClassAllocation {
            asset_class: asset_class.to_string(),
            current_value: dec!(150),
            current_pct: 15.0,
            target_pct: 10.0,
            target_value: dec!(100),
            diff: dec!(50),
            diff_pct,
            assets: Vec::new(),
        }
    }

    #[test]
    fn drifted_classes_filters_by_tolerance() {
        let report = AllocationReport {
            total_value: dec!(1000),
            asset_classes: vec![class("stocks", 5.0), class("crypto", 0.0)],
            total_drift: 5.0,
            needs_rebalancing: true,
            rebalancing_threshold: 5.0,
            rebalancing_actions: Vec::new(),
        };
        assert_eq!(report.drifted_classes(2.0).len(), 1);
        assert_eq!(report.drifted_classes(10.0).len(), 0);
    }
}
