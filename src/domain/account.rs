use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single position held by an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub value: Decimal,
}

/// One brokerage/exchange account. Multi-account allocation aggregates these
/// by symbol before computing portfolio-wide drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub positions: Vec<Position>,
}

impl Account {
    pub fn total_value(&self) -> Decimal {
        self.positions.iter().map(|p| p.value).sum()
    }

    pub fn values_by_symbol(&self) -> HashMap<String, Decimal> {
        let mut out: HashMap<String, Decimal> = HashMap::new();
        for pos in &self.positions {
            *out.entry(pos.symbol.clone()).or_insert(Decimal::ZERO) += pos.value;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_value_sums_positions() {
        let account = Account {
            id: "acc-1".into(),
            name: "main".into(),
            positions: vec![
                Position {
                    symbol: "BTC".into(),
                    quantity: dec!(1),
                    value: dec!(60000),
                },
                Position {
                    symbol: "ETH".into(),
                    quantity: dec!(10),
                    value: dec!(40000),
                },
            ],
        };
        assert_eq!(account.total_value(), dec!(100000));
    }

    #[test]
    fn values_by_symbol_aggregates_duplicate_positions() {
        let account = Account {
            id: "acc-1".into(),
            name: "main".into(),
            positions: vec![
                Position {
                    symbol: "BTC".into(),
                    quantity: dec!(1),
                    value: dec!(30000),
                },
                Position {
                    symbol: "BTC".into(),
                    quantity: dec!(0.5),
                    value: dec!(15000),
                },
            ],
        };
        let by_symbol = account.values_by_symbol();
        assert_eq!(by_symbol.get("BTC").copied(), Some(dec!(45000)));
    }
}
