use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::AppError;

/// A single OHLCV observation for a symbol on a given date, as produced by
/// one adapter. Uniqueness is (symbol, date, adapter); dates are always
/// timezone-naive UTC calendar days (Design Notes: "Timezones").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub adapter: String,
}

impl PriceObservation {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        adapter: impl Into<String>,
    ) -> Result<Self, AppError> {
        let obs = Self {
            symbol: symbol.into(),
            date,
            open,
            high,
            low,
            close,
            volume,
            adapter: adapter.into(),
        };
        obs.validate()?;
        Ok(obs)
    }

    /// high >= max(open, close, low); low <= min(open, close, high); volume >= 0.
    pub fn validate(&self) -> Result<(), AppError> {
        let max_ock = self.open.max(self.close).max(self.low);
        if self.high < max_ock {
            return Err(AppError::validation(format!(
                "{} {}: high {} below max(open,close,low) {}",
                self.symbol, self.date, self.high, max_ock
            )));
        }
        let min_och = self.open.min(self.close).min(self.high);
        if self.low > min_och {
            return Err(AppError::validation(format!(
                "{} {}: low {} above min(open,close,high) {}",
                self.symbol, self.date, self.low, min_och
            )));
        }
        if self.volume < Decimal::ZERO {
            return Err(AppError::validation(format!(
                "{} {}: negative volume {}",
                self.symbol, self.date, self.volume
            )));
        }
        Ok(())
    }

    pub fn key(&self) -> (String, NaiveDate, String) {
        (self.symbol.clone(), self.date, self.adapter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn accepts_well_formed_candle() {
        let obs = PriceObservation::new(
            "BTC",
            date("2024-01-01"),
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(10),
            "binance",
        );
        assert!(obs.is_ok());
    }

    #[test]
    fn rejects_high_below_close() {
        let obs = PriceObservation::new(
            "BTC",
            date("2024-01-01"),
            dec!(100),
            dec!(101),
            dec!(95),
            dec!(105),
            dec!(10),
            "binance",
        );
        assert!(obs.is_err());
    }

    #[test]
    fn rejects_negative_volume() {
        let obs = PriceObservation::new(
            "BTC",
            date("2024-01-01"),
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(-1),
            "binance",
        );
        assert!(obs.is_err());
    }
}
