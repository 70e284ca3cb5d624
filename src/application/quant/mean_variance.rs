use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::errors::AppError;

const BTC_MIN: f64 = 0.50;
const BTC_MAX: f64 = 0.60;
const OTHER_MAX: f64 = 0.20;
const ZERO_THRESHOLD: f64 = 1e-4;
const BOUND_TOLERANCE: f64 = 1e-3;
const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    MaxSharpe,
    MinVolatility,
    EfficientRisk(f64),
    EfficientReturn(f64),
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub weights: HashMap<String, f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub bounds_satisfied: bool,
}

/// Mean-variance optimizer with a required BTC band and a per-asset cap on
/// everything else. Solved by projected gradient ascent/descent on the
/// relevant objective rather than an interior-point QP, since the feasible
/// region (box bounds + a single equality) projects in closed form.
pub struct MeanVarianceOptimizer {
    symbols: Vec<String>,
    mean_returns: DVector<f64>,
    covariance: DMatrix<f64>,
    risk_free_rate: f64,
}

impl MeanVarianceOptimizer {
    /// `daily_returns` maps symbol -> daily return series, all the same length.
    pub fn from_daily_returns(
        daily_returns: &HashMap<String, Vec<f64>>,
        risk_free_rate: f64,
    ) -> Result<Self, AppError> {
        if !daily_returns.contains_key("BTC") {
            return Err(AppError::constraint(
                "mean-variance optimizer requires BTC in the asset universe".to_string(),
            ));
        }

        let mut symbols: Vec<String> = daily_returns.keys().cloned().collect();
        symbols.sort();
        let n = symbols.len();
        let t = daily_returns.values().map(|v| v.len()).min().unwrap_or(0);
        if t < 2 {
            return Err(AppError::data_insufficient(
                "at least 2 return observations are required".to_string(),
            ));
        }

        let returns_matrix: Vec<Vec<f64>> = symbols
            .iter()
            .map(|s| daily_returns[s][..t].to_vec())
            .collect();

        let mean_returns = DVector::from_iterator(
            n,
            returns_matrix
                .iter()
                .map(|series| series.iter().sum::<f64>() / t as f64 * TRADING_DAYS),
        );

        let means_daily: Vec<f64> = returns_matrix
            .iter()
            .map(|series| series.iter().sum::<f64>() / t as f64)
            .collect();

        let mut covariance = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let cov: f64 = (0..t)
                    .map(|k| (returns_matrix[i][k] - means_daily[i]) * (returns_matrix[j][k] - means_daily[j]))
                    .sum::<f64>()
                    / (t as f64 - 1.0).max(1.0);
                covariance[(i, j)] = cov * TRADING_DAYS;
            }
        }

        Ok(Self {
            symbols,
            mean_returns,
            covariance,
            risk_free_rate,
        })
    }

    fn lower_bound(&self, idx: usize) -> f64 {
        if self.symbols[idx] == "BTC" { BTC_MIN } else { 0.0 }
    }

    fn upper_bound(&self, idx: usize) -> f64 {
        if self.symbols[idx] == "BTC" { BTC_MAX } else { OTHER_MAX }
    }

    /// Projects onto { Σw=1, lb<=w<=ub } via iterative clamp-and-renormalize;
    /// converges quickly for box constraints this tight relative to n.
    fn project(&self, mut w: DVector<f64>) -> DVector<f64> {
        for _ in 0..200 {
            for i in 0..w.len() {
                w[i] = w[i].clamp(self.lower_bound(i), self.upper_bound(i));
            }
            let sum: f64 = w.iter().sum();
            if (sum - 1.0).abs() < 1e-12 {
                break;
            }
            let free_mass = 1.0 - sum;
            let free_indices: Vec<usize> = (0..w.len())
                .filter(|&i| w[i] > self.lower_bound(i) + 1e-9 && w[i] < self.upper_bound(i) - 1e-9)
                .collect();
            if free_indices.is_empty() {
                break;
            }
            let share = free_mass / free_indices.len() as f64;
            for i in free_indices {
                w[i] += share;
            }
        }
        w
    }

    fn portfolio_return(&self, w: &DVector<f64>) -> f64 {
        self.mean_returns.dot(w)
    }

    fn portfolio_volatility(&self, w: &DVector<f64>) -> f64 {
        (w.transpose() * &self.covariance * w)[(0, 0)].max(0.0).sqrt()
    }

    fn sharpe(&self, w: &DVector<f64>) -> f64 {
        let vol = self.portfolio_volatility(w);
        if vol == 0.0 {
            0.0
        } else {
            (self.portfolio_return(w) - self.risk_free_rate) / vol
        }
    }

    fn initial_weights(&self) -> DVector<f64> {
        let n = self.symbols.len();
        let btc_idx = self.symbols.iter().position(|s| s == "BTC").unwrap();
        let mut w = DVector::from_element(n, 0.0);
        w[btc_idx] = (BTC_MIN + BTC_MAX) / 2.0;
        let remainder = 1.0 - w[btc_idx];
        let others = n - 1;
        if others > 0 {
            for i in 0..n {
                if i != btc_idx {
                    w[i] = remainder / others as f64;
                }
            }
        }
        self.project(w)
    }

    pub fn optimize(&self, objective: Objective) -> OptimizationResult {
        let mut w = self.initial_weights();
        let step = 0.01;

        for _ in 0..2000 {
            let grad = match objective {
                Objective::MinVolatility => &self.covariance * &w * 2.0,
                Objective::MaxSharpe => {
                    let vol = self.portfolio_volatility(&w).max(1e-9);
                    let ret_term = self.mean_returns.clone();
                    let risk_term = &self.covariance * &w * ((self.portfolio_return(&w) - self.risk_free_rate) / (vol * vol * vol));
                    -(ret_term - risk_term)
                }
                Objective::EfficientRisk(target_vol) => {
                    let vol = self.portfolio_volatility(&w);
                    let vol_penalty = &self.covariance * &w * 2.0 * (vol - target_vol).signum();
                    -self.mean_returns.clone() + vol_penalty
                }
                Objective::EfficientReturn(target_return) => {
                    let ret = self.portfolio_return(&w);
                    let ret_penalty = self.mean_returns.clone() * (ret - target_return).signum();
                    &self.covariance * &w * 2.0 + ret_penalty
                }
            };
            w -= step * grad.clone() / (grad.norm().max(1.0));
            w = self.project(w);
        }

        for i in 0..w.len() {
            if w[i].abs() < ZERO_THRESHOLD {
                w[i] = 0.0;
            }
        }
        let sum: f64 = w.iter().sum();
        if sum > 0.0 {
            w /= sum;
        }

        let bounds_satisfied = (0..w.len()).all(|i| {
            w[i] >= self.lower_bound(i) - BOUND_TOLERANCE && w[i] <= self.upper_bound(i) + BOUND_TOLERANCE
        }) && ((w.iter().sum::<f64>() - 1.0).abs() < BOUND_TOLERANCE);

        let weights = self
            .symbols
            .iter()
            .cloned()
            .zip(w.iter().copied())
            .collect();

        OptimizationResult {
            weights,
            expected_return: self.portfolio_return(&w),
            volatility: self.portfolio_volatility(&w),
            sharpe: self.sharpe(&w),
            bounds_satisfied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_returns() -> HashMap<String, Vec<f64>> {
        let mut m = HashMap::new();
        m.insert("BTC".to_string(), vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02]);
        m.insert("ETH".to_string(), vec![0.02, -0.01, 0.01, 0.0, -0.02, 0.03]);
        m.insert("AAPL".to_string(), vec![0.001, 0.002, -0.001, 0.0015, 0.0005, -0.0005]);
        m
    }

    #[test]
    fn rejects_universe_without_btc() {
        let mut m = sample_returns();
        m.remove("BTC");
        assert!(MeanVarianceOptimizer::from_daily_returns(&m, 0.02).is_err());
    }

    #[test]
    fn min_volatility_respects_btc_band_and_caps() {
        let optimizer = MeanVarianceOptimizer::from_daily_returns(&sample_returns(), 0.02).unwrap();
        let result = optimizer.optimize(Objective::MinVolatility);
        let btc_w = result.weights["BTC"];
        assert!(btc_w >= BTC_MIN - 1e-2 && btc_w <= BTC_MAX + 1e-2);
        for (symbol, w) in &result.weights {
            if symbol != "BTC" {
                assert!(*w <= OTHER_MAX + 1e-2);
            }
        }
        let sum: f64 = result.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-2);
    }

    #[test]
    fn max_sharpe_produces_a_valid_weight_set() {
        let optimizer = MeanVarianceOptimizer::from_daily_returns(&sample_returns(), 0.02).unwrap();
        let result = optimizer.optimize(Objective::MaxSharpe);
        let sum: f64 = result.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-2);
    }
}
