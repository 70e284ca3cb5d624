use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::application::allocation::tracker::{AllocationTracker, Holding};
use crate::domain::account::Account;
use crate::domain::allocation::AllocationReport;

/// Aggregates holdings across multiple accounts into a single portfolio
/// view and delegates to the single-account tracker for the actual
/// class-mix math.
pub struct MultiAccountTracker {
    tracker: AllocationTracker,
}

impl MultiAccountTracker {
    pub fn new() -> Self {
        Self { tracker: AllocationTracker::new() }
    }

    /// `asset_classes` maps symbol -> asset class, since `Account`/`Position`
    /// carry value but not classification.
    pub fn aggregate_report(&self, accounts: &[Account], asset_classes: &HashMap<String, String>) -> AllocationReport {
        let mut total = Decimal::ZERO;
        let mut combined: HashMap<String, Decimal> = HashMap::new();

        for account in accounts {
            total += account.total_value();
            for (symbol, value) in account.values_by_symbol() {
                *combined.entry(symbol).or_insert(Decimal::ZERO) += value;
            }
        }

        let holdings: Vec<Holding> = combined
            .into_iter()
            .map(|(symbol, value)| {
                let asset_class = asset_classes.get(&symbol).cloned().unwrap_or_else(|| "stocks".to_string());
                Holding { symbol, asset_class, value }
            })
            .collect();

        self.tracker.calculate_allocation(&holdings, total)
    }
}

impl Default for MultiAccountTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Position;
    use rust_decimal_macros::dec;

    #[test]
    fn aggregates_positions_across_accounts_before_classifying() {
        let accounts = vec![
            Account {
                id: "a1".into(),
                name: "Brokerage".into(),
                positions: vec![Position { symbol: "AAPL".into(), quantity: dec!(1), value: dec!(600) }],
            },
            Account {
                id: "a2".into(),
                name: "Crypto".into(),
                positions: vec![Position { symbol: "BTC".into(), quantity: dec!(1), value: dec!(400) }],
            },
        ];
        let mut classes = HashMap::new();
        classes.insert("AAPL".to_string(), "stocks".to_string());
        classes.insert("BTC".to_string(), "crypto".to_string());

        let tracker = MultiAccountTracker::new();
        let report = tracker.aggregate_report(&accounts, &classes);
        assert_eq!(report.total_value, dec!(1000));
    }
}
