use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution as RandDistribution, Normal};
use statrs::statistics::{Data, Distribution};

use crate::domain::errors::AppError;

const TRADING_DAYS: f64 = 252.0;
const MIN_FACTOR_OBSERVATIONS: usize = 30;
const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CvarMethod {
    Historical,
    Parametric,
    MonteCarlo { iterations: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct CvarResult {
    pub var: f64,
    pub cvar: f64,
    pub confidence: f64,
}

/// Historical CVaR: the mean loss beyond the empirical VaR quantile.
fn cvar_historical(returns: &[f64], confidence: f64) -> Option<CvarResult> {
    if returns.is_empty() {
        return None;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let cutoff_idx = (((1.0 - confidence) * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    let var = -sorted[cutoff_idx];
    let tail = &sorted[..=cutoff_idx];
    let cvar = -tail.iter().sum::<f64>() / tail.len() as f64;
    Some(CvarResult { var, cvar, confidence })
}

/// Parametric (Gaussian) CVaR using the closed-form normal-loss expression.
fn cvar_parametric(returns: &[f64], confidence: f64) -> Option<CvarResult> {
    if returns.len() < 2 {
        return None;
    }
    let data = Data::new(returns.to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;
    if std_dev == 0.0 {
        return Some(CvarResult { var: -mean, cvar: -mean, confidence });
    }
    let z = inverse_normal_cdf(1.0 - confidence);
    let phi_z = (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let var = -(mean + std_dev * z);
    let cvar = -(mean - std_dev * phi_z / (1.0 - confidence));
    Some(CvarResult { var, cvar, confidence })
}

/// Monte Carlo CVaR: simulates return paths from the sample mean/std under a
/// deterministic seed so results are reproducible across runs.
fn cvar_monte_carlo(returns: &[f64], confidence: f64, iterations: usize, seed: u64) -> Option<CvarResult> {
    if returns.len() < 2 {
        return None;
    }
    let data = Data::new(returns.to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;
    if std_dev == 0.0 {
        return Some(CvarResult { var: -mean, cvar: -mean, confidence });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(mean, std_dev).ok()?;
    let mut simulated: Vec<f64> = (0..iterations).map(|_| normal.sample(&mut rng)).collect();
    simulated.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let cutoff_idx = (((1.0 - confidence) * simulated.len() as f64).floor() as usize).min(simulated.len() - 1);
    let var = -simulated[cutoff_idx];
    let tail = &simulated[..=cutoff_idx];
    let cvar = -tail.iter().sum::<f64>() / tail.len() as f64;
    Some(CvarResult { var, cvar, confidence })
}

/// Abramowitz-Stegun rational approximation of the inverse standard-normal CDF.
fn inverse_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(1e-10, 1.0 - 1e-10);
    let a = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    let b = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    let c = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    let d = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    let p_low = 0.02425;
    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    } else if p <= 1.0 - p_low {
        let q = p - 0.5;
        let r = q * q;
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    }
}

pub fn conditional_value_at_risk(returns: &[f64], confidence: f64, method: CvarMethod) -> Option<CvarResult> {
    match method {
        CvarMethod::Historical => cvar_historical(returns, confidence),
        CvarMethod::Parametric => cvar_parametric(returns, confidence),
        CvarMethod::MonteCarlo { iterations } => {
            cvar_monte_carlo(returns, confidence, iterations, DEFAULT_SEED)
        }
    }
}

/// Maximum peak-to-trough drawdown over a cumulative-return path.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut cumulative = 1.0;
    let mut peak = 1.0;
    let mut worst = 0.0;
    for r in returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        let drawdown = (peak - cumulative) / peak;
        if drawdown > worst {
            worst = drawdown;
        }
    }
    worst
}

/// Annualized Sharpe ratio assuming 252 trading bars per year.
pub fn annualized_sharpe(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let data = Data::new(returns.to_vec());
    let mean = data.mean().unwrap_or(0.0);
    let std_dev = data.std_dev().unwrap_or(0.0);
    if std_dev == 0.0 {
        return 0.0;
    }
    let annualized_return = mean * TRADING_DAYS;
    let annualized_vol = std_dev * TRADING_DAYS.sqrt();
    (annualized_return - risk_free_rate) / annualized_vol
}

#[derive(Debug, Clone)]
pub struct FactorRegression {
    pub alpha: f64,
    pub betas: Vec<f64>,
    pub t_stats: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub aic: f64,
    pub bic: f64,
    pub residual_mean: f64,
    pub residual_skewness: f64,
}

/// Ordinary least squares of `asset_returns` on `factor_returns` (n factors,
/// each a same-length series) via the normal equations, solved with
/// nalgebra's LU decomposition. Requires at least 30 aligned observations to
/// keep t-stats meaningful.
pub fn factor_regression(
    asset_returns: &[f64],
    factor_returns: &[Vec<f64>],
) -> Result<FactorRegression, AppError> {
    let n_obs = asset_returns.len();
    if n_obs < MIN_FACTOR_OBSERVATIONS {
        return Err(AppError::data_insufficient(format!(
            "factor regression requires at least {MIN_FACTOR_OBSERVATIONS} observations, got {n_obs}"
        )));
    }
    let n_factors = factor_returns.len();
    if n_factors == 0 {
        return Err(AppError::validation("at least one factor is required".to_string()));
    }
    if factor_returns.iter().any(|f| f.len() != n_obs) {
        return Err(AppError::validation("factor series must align with asset returns".to_string()));
    }

    let k = n_factors + 1;
    let mut design = DMatrix::<f64>::zeros(n_obs, k);
    for row in 0..n_obs {
        design[(row, 0)] = 1.0;
        for (col, factor) in factor_returns.iter().enumerate() {
            design[(row, col + 1)] = factor[row];
        }
    }
    let y = DVector::from_row_slice(asset_returns);

    let xtx = design.transpose() * &design;
    let xty = design.transpose() * &y;
    let xtx_inv = xtx
        .clone()
        .try_inverse()
        .ok_or_else(|| AppError::internal("factor design matrix is singular".to_string()))?;
    let coefficients = &xtx_inv * &xty;

    let fitted = &design * &coefficients;
    let residuals = &y - &fitted;
    let dof = (n_obs as f64 - k as f64).max(1.0);
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma_squared = rss / dof;

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (n_obs as f64 - 1.0) / dof;

    let se: Vec<f64> = (0..k).map(|i| (sigma_squared * xtx_inv[(i, i)]).sqrt()).collect();
    let t_stats: Vec<f64> = (0..k)
        .map(|i| if se[i] > 0.0 { coefficients[i] / se[i] } else { 0.0 })
        .collect();
    let p_values: Vec<f64> = t_stats.iter().map(|t| two_sided_p_value(*t, dof)).collect();

    let log_likelihood = -0.5 * n_obs as f64 * ((2.0 * std::f64::consts::PI * sigma_squared.max(1e-12)).ln() + 1.0);
    let aic = 2.0 * k as f64 - 2.0 * log_likelihood;
    let bic = (n_obs as f64).ln() * k as f64 - 2.0 * log_likelihood;

    let residual_vec: Vec<f64> = residuals.iter().copied().collect();
    let residual_data = Data::new(residual_vec.clone());
    let residual_mean = residual_data.mean().unwrap_or(0.0);
    let residual_std = residual_data.std_dev().unwrap_or(0.0);
    let residual_skewness = if residual_std > 0.0 {
        residual_vec
            .iter()
            .map(|r| ((r - residual_mean) / residual_std).powi(3))
            .sum::<f64>()
            / residual_vec.len() as f64
    } else {
        0.0
    };

    Ok(FactorRegression {
        alpha: coefficients[0],
        betas: coefficients.iter().skip(1).copied().collect(),
        t_stats,
        p_values,
        r_squared,
        adjusted_r_squared,
        aic,
        bic,
        residual_mean,
        residual_skewness,
    })
}

/// Approximate two-sided p-value for a t-statistic using the normal
/// approximation, adequate once degrees of freedom exceed ~30.
fn two_sided_p_value(t_stat: f64, _dof: f64) -> f64 {
    let z = t_stat.abs();
    let p_one_sided = 0.5 * erfc(z / std::f64::consts::SQRT_2);
    (2.0 * p_one_sided).clamp(0.0, 1.0)
}

fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let y = 1.0
        - (((((1.061405429 * t - 1.453152027) * t) + 1.421413741) * t - 0.284496736) * t + 0.254829592)
            * t
            * (-x * x).exp();
    if x >= 0.0 { 1.0 - y } else { 1.0 + y }
}

#[derive(Debug, Clone)]
pub struct FactorRiskDecomposition {
    pub factor_variance: f64,
    pub residual_variance: f64,
    pub total_variance: f64,
    pub marginal_contributions: Vec<f64>,
}

/// Decomposes an asset's variance into systematic (factor-driven) and
/// idiosyncratic (residual) components given the regression betas and the
/// factor covariance matrix.
pub fn factor_risk_decomposition(
    betas: &[f64],
    factor_covariance: &DMatrix<f64>,
    residual_variance: f64,
) -> FactorRiskDecomposition {
    let b = DVector::from_row_slice(betas);
    let factor_variance = (b.transpose() * factor_covariance * &b)[(0, 0)].max(0.0);
    let total_variance = factor_variance + residual_variance;

    let marginal_contributions: Vec<f64> = if total_variance > 0.0 {
        let factor_cov_b = factor_covariance * &b;
        (0..betas.len())
            .map(|i| betas[i] * factor_cov_b[i] / total_variance)
            .collect()
    } else {
        vec![0.0; betas.len()]
    };

    FactorRiskDecomposition {
        factor_variance,
        residual_variance,
        total_variance,
        marginal_contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_returns() -> Vec<f64> {
        vec![
            0.01, -0.02, 0.015, -0.03, 0.02, -0.01, 0.005, -0.025, 0.03, -0.015, 0.01, -0.02, 0.015,
            -0.005, 0.02, -0.01, 0.01, -0.02, 0.005, -0.015,
        ]
    }

    #[test]
    fn historical_cvar_is_worse_than_or_equal_to_var() {
        let result = cvar_historical(&sample_returns(), 0.95).unwrap();
        assert!(result.cvar >= result.var - 1e-9);
    }

    #[test]
    fn parametric_and_monte_carlo_cvar_are_in_the_same_ballpark() {
        let returns = sample_returns();
        let parametric = cvar_parametric(&returns, 0.95).unwrap();
        let monte_carlo = cvar_monte_carlo(&returns, 0.95, 20_000, DEFAULT_SEED).unwrap();
        assert!((parametric.cvar - monte_carlo.cvar).abs() < 0.05);
    }

    #[test]
    fn monte_carlo_cvar_is_deterministic_for_a_fixed_seed() {
        let returns = sample_returns();
        let a = cvar_monte_carlo(&returns, 0.95, 5_000, DEFAULT_SEED).unwrap();
        let b = cvar_monte_carlo(&returns, 0.95, 5_000, DEFAULT_SEED).unwrap();
        assert_eq!(a.cvar, b.cvar);
    }

    #[test]
    fn max_drawdown_of_monotonic_gains_is_zero() {
        let returns = vec![0.01, 0.02, 0.01, 0.03];
        assert_eq!(max_drawdown(&returns), 0.0);
    }

    #[test]
    fn max_drawdown_detects_a_known_decline() {
        let returns = vec![0.10, -0.20, 0.05];
        let dd = max_drawdown(&returns);
        assert!(dd > 0.15 && dd < 0.20);
    }

    #[test]
    fn factor_regression_rejects_short_series() {
        let asset = vec![0.01; 10];
        let factor = vec![vec![0.01; 10]];
        assert!(factor_regression(&asset, &factor).is_err());
    }

    #[test]
    fn factor_regression_recovers_a_known_linear_relationship() {
        let n = 40;
        let market: Vec<f64> = (0..n).map(|i| 0.001 * i as f64 - 0.02).collect();
        let asset: Vec<f64> = market.iter().map(|m| 0.0005 + 1.5 * m).collect();
        let result = factor_regression(&asset, &[market]).unwrap();
        assert!((result.betas[0] - 1.5).abs() < 1e-6);
        assert!(result.r_squared > 0.99);
    }
}
