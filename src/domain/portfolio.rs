use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::errors::AppError;

/// Symbol -> weight mapping. Weights must sum to 1 within a small tolerance
/// and BTC's share must sit within the platform's numeraire band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub weights: HashMap<String, Decimal>,
}

impl Portfolio {
    pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;
    pub const BTC_MIN_SHARE: f64 = 0.50;
    pub const BTC_MAX_SHARE: f64 = 0.60;

    pub fn new(weights: HashMap<String, Decimal>) -> Result<Self, AppError> {
        let portfolio = Self { weights };
        portfolio.validate()?;
        Ok(portfolio)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let sum: Decimal = self.weights.values().copied().sum();
        let sum_f64 = sum.to_f64().unwrap_or(f64::NAN);
        if (sum_f64 - 1.0).abs() > Self::WEIGHT_SUM_TOLERANCE {
            return Err(AppError::constraint(format!(
                "portfolio weights sum to {sum}, expected 1.0 +/- {}",
                Self::WEIGHT_SUM_TOLERANCE
            )));
        }

        if let Some(btc) = self.weights.get("BTC") {
            let btc = btc.to_f64().unwrap_or(f64::NAN);
            if !(Self::BTC_MIN_SHARE..=Self::BTC_MAX_SHARE).contains(&btc) {
                return Err(AppError::constraint(format!(
                    "BTC weight {btc} outside required band [{}, {}]",
                    Self::BTC_MIN_SHARE,
                    Self::BTC_MAX_SHARE
                )));
            }
        }
        Ok(())
    }

    pub fn weight_of(&self, symbol: &str) -> Decimal {
        self.weights.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }
}
