use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;

use crate::application::router::Router;

/// Outer-aligns each symbol's daily close series on shared dates, then
/// returns pct-change returns per symbol keyed by date (first date dropped,
/// since its return is undefined).
async fn aligned_returns(
    router: &Router,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> HashMap<String, BTreeMap<NaiveDate, f64>> {
    let mut closes: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
    for symbol in symbols {
        let observations = router
            .fetch_historical(symbol, start, end, None)
            .await
            .unwrap_or_default();
        let series: BTreeMap<NaiveDate, f64> = observations
            .into_iter()
            .filter_map(|o| Some((o.date, o.close.to_f64()?)))
            .collect();
        closes.insert(symbol.clone(), series);
    }

    closes
        .into_iter()
        .map(|(symbol, series)| {
            let dates: Vec<NaiveDate> = series.keys().copied().collect();
            let mut returns = BTreeMap::new();
            for window in dates.windows(2) {
                let prev = series[&window[0]];
                let curr = series[&window[1]];
                if prev != 0.0 {
                    returns.insert(window[1], (curr - prev) / prev);
                }
            }
            (symbol, returns)
        })
        .collect()
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..a.len() {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Symmetric Pearson correlation matrix over the given symbols. Fewer than
/// two usable series returns an empty matrix.
pub struct CorrelationEngine<'a> {
    router: &'a Router,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(router: &'a Router) -> Self {
        Self { router }
    }

    pub async fn correlation_matrix(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<(String, String), f64> {
        if symbols.len() < 2 {
            return HashMap::new();
        }

        let returns = aligned_returns(self.router, symbols, start, end).await;
        let mut matrix = HashMap::new();

        for i in 0..symbols.len() {
            for j in i..symbols.len() {
                let sym_a = &symbols[i];
                let sym_b = &symbols[j];
                let (Some(series_a), Some(series_b)) = (returns.get(sym_a), returns.get(sym_b))
                else {
                    continue;
                };

                let common_dates: Vec<NaiveDate> = series_a
                    .keys()
                    .filter(|d| series_b.contains_key(d))
                    .copied()
                    .collect();
                let a: Vec<f64> = common_dates.iter().map(|d| series_a[d]).collect();
                let b: Vec<f64> = common_dates.iter().map(|d| series_b[d]).collect();

                let corr = if sym_a == sym_b { 1.0 } else { pearson(&a, &b) };
                matrix.insert((sym_a.clone(), sym_b.clone()), corr);
                matrix.insert((sym_b.clone(), sym_a.clone()), corr);
            }
        }
        matrix
    }

    pub async fn correlation_to_btc(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<String, f64> {
        let mut with_btc = symbols.to_vec();
        if !with_btc.iter().any(|s| s == "BTC") {
            with_btc.push("BTC".to_string());
        }
        let matrix = self.correlation_matrix(&with_btc, start, end).await;
        symbols
            .iter()
            .filter(|s| s.as_str() != "BTC")
            .filter_map(|s| matrix.get(&(s.clone(), "BTC".to_string())).map(|c| (s.clone(), *c)))
            .collect()
    }

    pub fn low_correlation_filter(
        &self,
        correlations: &HashMap<String, f64>,
        threshold: f64,
    ) -> Vec<String> {
        correlations
            .iter()
            .filter(|(_, c)| **c <= threshold)
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Greedily selects `target_count` assets: start with the lowest
    /// BTC-correlation asset, then repeatedly add whichever remaining asset
    /// has the lowest mean correlation to the already-selected set.
    pub fn greedy_diversification(
        &self,
        btc_correlations: &HashMap<String, f64>,
        pairwise: &HashMap<(String, String), f64>,
        target_count: usize,
    ) -> Vec<String> {
        let mut remaining: Vec<String> = btc_correlations.keys().cloned().collect();
        if remaining.is_empty() || target_count == 0 {
            return Vec::new();
        }

        remaining.sort_by(|a, b| {
            btc_correlations[a]
                .partial_cmp(&btc_correlations[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut selected = vec![remaining.remove(0)];

        while selected.len() < target_count && !remaining.is_empty() {
            let mut best_idx = 0;
            let mut best_mean = f64::INFINITY;
            for (idx, candidate) in remaining.iter().enumerate() {
                let mean: f64 = selected
                    .iter()
                    .map(|s| {
                        pairwise
                            .get(&(candidate.clone(), s.clone()))
                            .copied()
                            .unwrap_or(0.0)
                    })
                    .sum::<f64>()
                    / selected.len() as f64;
                if mean < best_mean {
                    best_mean = mean;
                    best_idx = idx;
                }
            }
            selected.push(remaining.remove(best_idx));
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_of_identical_series_is_one() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_inverse_series_is_negative_one() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_handles_constant_series_without_panicking() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![2.0, 3.0, 4.0];
        assert_eq!(pearson(&a, &b), 0.0);
    }
}
