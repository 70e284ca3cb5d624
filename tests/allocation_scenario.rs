//! End-to-end: the worked allocation-drift example from the design
//! document, driven through `AllocationTracker` with real holdings.

use fks_portfolio::application::allocation::tracker::{AllocationTracker, Holding};
use fks_portfolio::domain::allocation::RebalanceDirection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn drifted_portfolio_produces_the_expected_rebalancing_actions() {
    let holdings = vec![
        Holding { symbol: "VTI".into(), asset_class: "stocks".into(), value: dec!(60000) },
        Holding { symbol: "BTC".into(), asset_class: "crypto".into(), value: dec!(15000) },
        Holding { symbol: "USD".into(), asset_class: "cash".into(), value: dec!(25000) },
    ];

    let tracker = AllocationTracker::new();
    let report = tracker.calculate_allocation(&holdings, dec!(100000));

    assert!(tracker.needs_rebalancing(&report));

    let sells: Vec<&str> = report
        .rebalancing_actions
        .iter()
        .filter(|a| a.action == RebalanceDirection::Sell)
        .map(|a| a.symbol.as_str())
        .collect();
    assert!(sells.contains(&"stocks"));
    assert!(sells.contains(&"crypto"));

    // cash is 25% of the portfolio against a 5% target, so it also drifts
    // into sell territory; the classes with no current holdings at all
    // (etfs, commodities, futures) are the ones bought to fill the target.
    assert!(sells.contains(&"cash"));

    let buys: Vec<&str> = report
        .rebalancing_actions
        .iter()
        .filter(|a| a.action == RebalanceDirection::Buy)
        .map(|a| a.symbol.as_str())
        .collect();
    assert!(buys.contains(&"etfs"));
    assert!(buys.contains(&"commodities"));
    assert!(buys.contains(&"futures"));

    let stocks_action = report.rebalancing_actions.iter().find(|a| a.symbol == "stocks").unwrap();
    assert_eq!(stocks_action.amount, dec!(10000));

    let crypto_action = report.rebalancing_actions.iter().find(|a| a.symbol == "crypto").unwrap();
    assert_eq!(crypto_action.amount, dec!(5000));

    let cash_action = report.rebalancing_actions.iter().find(|a| a.symbol == "cash").unwrap();
    assert_eq!(cash_action.amount, dec!(20000));

    let class_value_sum: Decimal = report.asset_classes.iter().map(|c| c.current_value).sum();
    assert_eq!(class_value_sum, dec!(100000));
    assert!(report.needs_rebalancing);
}
