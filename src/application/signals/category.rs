use chrono::Duration;

use crate::domain::signal::TradeCategory;

/// Immutable per-category configuration: horizon bounds, TP/SL ranges (as
/// percentages), and the indicators that category is expected to weigh.
#[derive(Debug, Clone)]
pub struct TradeCategoryConfig {
    pub category: TradeCategory,
    pub min_horizon: Duration,
    pub max_horizon: Duration,
    pub take_profit_pct: (f64, f64),
    pub stop_loss_pct: (f64, f64),
    pub indicators: &'static [&'static str],
}

pub fn config_for(category: TradeCategory) -> TradeCategoryConfig {
    match category {
        TradeCategory::Scalp => TradeCategoryConfig {
            category,
            min_horizon: Duration::seconds(30),
            max_horizon: Duration::minutes(15),
            take_profit_pct: (0.1, 0.5),
            stop_loss_pct: (0.05, 0.2),
            indicators: &["order_book", "tick_data", "momentum", "volume_spike"],
        },
        TradeCategory::Intraday => TradeCategoryConfig {
            category,
            min_horizon: Duration::minutes(15),
            max_horizon: Duration::hours(24),
            take_profit_pct: (0.5, 2.0),
            stop_loss_pct: (0.2, 1.0),
            indicators: &["rsi", "macd", "bollinger_bands", "volume", "support_resistance"],
        },
        TradeCategory::Swing => TradeCategoryConfig {
            category,
            min_horizon: Duration::days(1),
            max_horizon: Duration::weeks(4),
            take_profit_pct: (2.0, 10.0),
            stop_loss_pct: (1.0, 5.0),
            indicators: &["ema", "sma", "rsi", "macd", "fibonacci", "chart_patterns"],
        },
        TradeCategory::LongTerm => TradeCategoryConfig {
            category,
            min_horizon: Duration::weeks(4),
            max_horizon: Duration::days(365),
            take_profit_pct: (10.0, 50.0),
            stop_loss_pct: (5.0, 15.0),
            indicators: &["fundamentals", "trend", "ema_long", "support_resistance_major"],
        },
    }
}

/// Classifies a trade by its expected holding duration; falls back to swing
/// when the duration falls outside every configured range.
pub fn classify_by_time_horizon(horizon: Duration) -> TradeCategory {
    TradeCategory::ALL
        .into_iter()
        .find(|&category| {
            let config = config_for(category);
            horizon >= config.min_horizon && horizon <= config.max_horizon
        })
        .unwrap_or(TradeCategory::Swing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalp_config_has_tightest_ranges() {
        let scalp = config_for(TradeCategory::Scalp);
        let long_term = config_for(TradeCategory::LongTerm);
        assert!(scalp.take_profit_pct.1 < long_term.take_profit_pct.0);
    }

    #[test]
    fn classifies_an_hour_long_trade_as_intraday() {
        assert_eq!(classify_by_time_horizon(Duration::hours(1)), TradeCategory::Intraday);
    }

    #[test]
    fn classifies_an_out_of_range_duration_as_swing() {
        assert_eq!(classify_by_time_horizon(Duration::seconds(1)), TradeCategory::Swing);
    }
}
