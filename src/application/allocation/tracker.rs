use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::allocation::{
    AllocationReport, AssetAllocation, AssetClassAllocation, RebalanceDirection, RebalancingAction,
};

pub const DEFAULT_REBALANCE_THRESHOLD_PCT: f64 = 5.0;

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Target class mix as percentages (0-100), summing to 100.
pub fn default_target_mix() -> HashMap<&'static str, f64> {
    HashMap::from([
        ("stocks", 50.0),
        ("etfs", 15.0),
        ("commodities", 15.0),
        ("crypto", 10.0),
        ("futures", 5.0),
        ("cash", 5.0),
    ])
}

/// Per-symbol caps that override the class-level distribution, e.g. capping
/// a single large holding below its class's proportional share.
pub fn symbol_overrides() -> HashMap<&'static str, f64> {
    HashMap::from([("AAPL", 10.0), ("COST", 8.0), ("HD", 7.0)])
}

#[derive(Debug, Clone)]
pub struct Holding {
    pub symbol: String,
    pub asset_class: String,
    pub value: Decimal,
}

/// Tracks one account's holdings against the target class mix and any
/// per-symbol overrides, producing a class-level allocation report plus the
/// rebalancing actions needed to close drift beyond the threshold.
pub struct AllocationTracker {
    target_mix: HashMap<&'static str, f64>,
    overrides: HashMap<&'static str, f64>,
    rebalance_threshold_pct: f64,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self {
            target_mix: default_target_mix(),
            overrides: symbol_overrides(),
            rebalance_threshold_pct: DEFAULT_REBALANCE_THRESHOLD_PCT,
        }
    }

    pub fn with_threshold(rebalance_threshold_pct: f64) -> Self {
        Self {
            rebalance_threshold_pct,
            ..Self::new()
        }
    }

    fn target_pct_for(&self, symbol: &str) -> Option<f64> {
        self.overrides.get(symbol).copied()
    }

    /// Target percent for a holding: its override if one exists, otherwise
    /// the class's remaining target (after overridden siblings are carved
    /// out) distributed proportionally by current value among the
    /// non-overridden holdings of that class.
    fn distribute_target_pct(
        &self,
        holding: &Holding,
        override_target_sum: &HashMap<&str, f64>,
        non_override_value: &HashMap<&str, f64>,
    ) -> f64 {
        if let Some(target) = self.target_pct_for(&holding.symbol) {
            return target;
        }
        let class = holding.asset_class.as_str();
        let class_target = self.target_mix.get(class).copied().unwrap_or(0.0);
        let remaining = (class_target - override_target_sum.get(class).copied().unwrap_or(0.0)).max(0.0);
        let class_non_override_value = non_override_value.get(class).copied().unwrap_or(0.0);
        if class_non_override_value > 0.0 {
            remaining * holding.value.to_f64().unwrap_or(0.0) / class_non_override_value
        } else {
            0.0
        }
    }

    pub fn calculate_allocation(&self, holdings: &[Holding], portfolio_value: Decimal) -> AllocationReport {
        let total = portfolio_value.to_f64().unwrap_or(0.0);

        let mut class_totals: HashMap<&str, f64> = self.target_mix.keys().map(|k| (*k, 0.0)).collect();
        let mut override_target_sum: HashMap<&str, f64> = HashMap::new();
        let mut non_override_value: HashMap<&str, f64> = HashMap::new();
        for holding in holdings {
            let value = holding.value.to_f64().unwrap_or(0.0);
            *class_totals.entry(holding.asset_class.as_str()).or_insert(0.0) += value;
            if let Some(target) = self.target_pct_for(&holding.symbol) {
                *override_target_sum.entry(holding.asset_class.as_str()).or_insert(0.0) += target;
            } else {
                *non_override_value.entry(holding.asset_class.as_str()).or_insert(0.0) += value;
            }
        }

        let assets: Vec<AssetAllocation> = holdings
            .iter()
            .map(|holding| {
                let value = holding.value.to_f64().unwrap_or(0.0);
                let current_pct = if total > 0.0 { value / total * 100.0 } else { 0.0 };
                let target_pct = self.distribute_target_pct(holding, &override_target_sum, &non_override_value);
                let target_value = total * target_pct / 100.0;
                AssetAllocation {
                    symbol: holding.symbol.clone(),
                    current_value: holding.value,
                    current_pct,
                    target_pct,
                    target_value: to_decimal(target_value),
                    diff: holding.value - to_decimal(target_value),
                    diff_pct: current_pct - target_pct,
                }
            })
            .collect();

        let mut total_drift = 0.0;
        let mut rebalancing_actions = Vec::new();
        let mut asset_classes = Vec::new();

        let mut class_names: Vec<&'static str> = self.target_mix.keys().copied().collect();
        class_names.sort();
        for class in class_names {
            let target_pct = self.target_mix[class];
            let current_value = *class_totals.get(class).unwrap_or(&0.0);
            let current_pct = if total > 0.0 { current_value / total * 100.0 } else { 0.0 };
            let target_value = total * target_pct / 100.0;
            let diff_value = current_value - target_value;
            let diff_pct = current_pct - target_pct;
            total_drift += diff_pct.abs();

            if diff_pct.abs() > self.rebalance_threshold_pct {
                rebalancing_actions.push(RebalancingAction {
                    symbol: class.to_string(),
                    action: if diff_value > 0.0 { RebalanceDirection::Sell } else { RebalanceDirection::Buy },
                    amount: to_decimal(diff_value.abs()),
                    reason: format!("{class} drifted {diff_pct:.2}pp from target {target_pct:.1}%"),
                });
            }

            let class_assets: Vec<AssetAllocation> = holdings
                .iter()
                .zip(assets.iter())
                .filter(|(holding, _)| holding.asset_class == class)
                .map(|(_, asset)| asset.clone())
                .collect();

            asset_classes.push(AssetClassAllocation {
                asset_class: class.to_string(),
                current_value: to_decimal(current_value),
                current_pct,
                target_pct,
                target_value: to_decimal(target_value),
                diff: to_decimal(diff_value),
                diff_pct,
                assets: class_assets,
            });
        }

        let needs_rebalancing = !rebalancing_actions.is_empty();

        AllocationReport {
            total_value: portfolio_value,
            asset_classes,
            total_drift,
            needs_rebalancing,
            rebalancing_threshold: self.rebalance_threshold_pct,
            rebalancing_actions,
        }
    }

    pub fn needs_rebalancing(&self, report: &AllocationReport) -> bool {
        report.needs_rebalancing
    }
}

impl Default for AllocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holdings() -> Vec<Holding> {
        vec![
            Holding { symbol: "AAPL".into(), asset_class: "stocks".into(), value: dec!(900) },
            Holding { symbol: "BTC".into(), asset_class: "crypto".into(), value: dec!(100) },
        ]
    }

    #[test]
    fn overweight_stocks_triggers_rebalancing() {
        let tracker = AllocationTracker::new();
        let report = tracker.calculate_allocation(&holdings(), dec!(1000));
        assert!(tracker.needs_rebalancing(&report));
        assert!(report.rebalancing_actions.iter().any(|a| a.symbol == "stocks" && a.action == RebalanceDirection::Sell));
    }

    #[test]
    fn balanced_portfolio_needs_no_rebalancing() {
        let tracker = AllocationTracker::new();
        let holdings = vec![
            Holding { symbol: "SPY".into(), asset_class: "stocks".into(), value: dec!(500) },
            Holding { symbol: "VTI".into(), asset_class: "etfs".into(), value: dec!(150) },
            Holding { symbol: "GLD".into(), asset_class: "commodities".into(), value: dec!(150) },
            Holding { symbol: "BTC".into(), asset_class: "crypto".into(), value: dec!(100) },
            Holding { symbol: "ES".into(), asset_class: "futures".into(), value: dec!(50) },
            Holding { symbol: "USD".into(), asset_class: "cash".into(), value: dec!(50) },
        ];
        let report = tracker.calculate_allocation(&holdings, dec!(1000));
        assert!(!tracker.needs_rebalancing(&report));
    }

    #[test]
    fn aapl_override_caps_its_target_below_the_class_share() {
        let tracker = AllocationTracker::new();
        let report = tracker.calculate_allocation(&holdings(), dec!(1000));
        let stocks = report.asset_classes.iter().find(|c| c.asset_class == "stocks").unwrap();
        let aapl = stocks.assets.iter().find(|a| a.symbol == "AAPL").unwrap();
        assert_eq!(aapl.target_pct, 10.0);
    }

    #[test]
    fn non_overridden_holdings_split_the_remaining_class_target_by_value() {
        let tracker = AllocationTracker::new();
        let holdings = vec![
            Holding { symbol: "AAPL".into(), asset_class: "stocks".into(), value: dec!(200) },
            Holding { symbol: "SPY".into(), asset_class: "stocks".into(), value: dec!(300) },
            Holding { symbol: "VTI".into(), asset_class: "stocks".into(), value: dec!(100) },
        ];
        let report = tracker.calculate_allocation(&holdings, dec!(1000));
        let stocks = report.asset_classes.iter().find(|c| c.asset_class == "stocks").unwrap();

        // AAPL keeps its 10% override; the remaining 40% of the 50% stocks
        // target is split between SPY and VTI 3:1 by current value.
        let spy = stocks.assets.iter().find(|a| a.symbol == "SPY").unwrap();
        let vti = stocks.assets.iter().find(|a| a.symbol == "VTI").unwrap();
        assert!((spy.target_pct - 30.0).abs() < 1e-9);
        assert!((vti.target_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn class_current_values_sum_to_the_portfolio_value() {
        let tracker = AllocationTracker::new();
        let report = tracker.calculate_allocation(&holdings(), dec!(1000));
        let sum: Decimal = report.asset_classes.iter().map(|c| c.current_value).sum();
        assert_eq!(sum, dec!(1000));
    }

    #[test]
    fn total_drift_sums_abs_diff_pct_across_every_target_class() {
        let tracker = AllocationTracker::new();
        let holdings = vec![
            Holding { symbol: "VTI".into(), asset_class: "stocks".into(), value: dec!(60000) },
            Holding { symbol: "BTC".into(), asset_class: "crypto".into(), value: dec!(15000) },
            Holding { symbol: "USD".into(), asset_class: "cash".into(), value: dec!(25000) },
        ];
        let report = tracker.calculate_allocation(&holdings, dec!(100000));
        // stocks +10, crypto +5, cash +20 against the three unheld classes
        // (etfs -15, commodities -15, futures -5) sums to 70 across all six
        // target classes, not just the three with holdings.
        assert!((report.total_drift - 70.0).abs() < 1e-9);
        assert_eq!(report.rebalancing_threshold, DEFAULT_REBALANCE_THRESHOLD_PCT);
    }
}
