use serde::{Deserialize, Serialize};

/// Trading days per year, used for every annualization in this module.
pub const ANNUAL_DAYS: f64 = 252.0;

/// Minimum number of returns for the empirical tail metrics (VaR, expected
/// shortfall) to be meaningful.
const MIN_TAIL_SAMPLES: usize = 20;

/// The default rolling window for the consistency score.
pub const CONSISTENCY_WINDOW: usize = 30;

/// The standardized set of performance and risk metrics derived from a daily
/// return series.
///
/// Every metric has a defined zero/neutral fallback on degenerate input; no
/// formula in this module may panic or divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskStats {
    pub total_return: f64,
    pub cagr: f64,
    /// Annualized volatility (sample standard deviation x sqrt(252)).
    pub ann_std: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Average win magnitude divided by average loss magnitude.
    pub reward_risk: f64,
    /// Largest peak-to-trough decline, as a non-negative magnitude.
    pub max_drawdown: f64,
    /// Decline from the all-time peak to the final value, signed (<= 0).
    pub current_dd: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_daily: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub var_95_historical: f64,
    pub var_95_parametric: f64,
    pub expected_shortfall: f64,
    pub consistency_score: f64,
}

impl RiskStats {
    pub fn zeroed() -> Self {
        Self {
            total_return: 0.0,
            cagr: 0.0,
            ann_std: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
            reward_risk: 0.0,
            max_drawdown: 0.0,
            current_dd: 0.0,
            win_rate: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            avg_daily: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            var_95_historical: 0.0,
            var_95_parametric: 0.0,
            expected_shortfall: 0.0,
            consistency_score: 0.0,
        }
    }
}

impl Default for RiskStats {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Computes the full metric set from a daily return series.
///
/// Drawdowns are measured on the index obtained by compounding the returns;
/// use [`compute_with_values`] when the raw value series is available.
pub fn compute(returns: &[f64]) -> RiskStats {
    let values = crate::index::build(returns, crate::index::BASE_INDEX);
    compute_with_values(returns, &values)
}

/// Computes the full metric set from a return series plus the raw value
/// series the drawdown metrics should be measured on.
pub fn compute_with_values(returns: &[f64], values: &[f64]) -> RiskStats {
    if returns.is_empty() {
        return RiskStats::zeroed();
    }

    let n = returns.len();
    let total_factor: f64 = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r));
    let total_return = total_factor - 1.0;

    let cagr = if total_factor > 0.0 {
        total_factor.powf(ANNUAL_DAYS / n as f64) - 1.0
    } else {
        0.0
    };

    let ann_std = sample_std(returns) * ANNUAL_DAYS.sqrt();
    let sharpe = if ann_std > 0.0 { cagr / ann_std } else { 0.0 };

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

    let sortino = if losses.is_empty() {
        if cagr > 0.0 { cagr } else { 0.0 }
    } else {
        let downside = sample_std(&losses) * ANNUAL_DAYS.sqrt();
        if downside > 0.0 { cagr / downside } else { 0.0 }
    };

    let avg_win = mean(&wins);
    let avg_loss = mean(&losses);
    let reward_risk = if wins.is_empty() || losses.is_empty() || avg_loss == 0.0 {
        0.0
    } else {
        avg_win / avg_loss.abs()
    };

    RiskStats {
        total_return,
        cagr,
        ann_std,
        sharpe,
        sortino,
        reward_risk,
        max_drawdown: max_drawdown(values),
        current_dd: current_drawdown(values),
        win_rate: wins.len() as f64 / n as f64,
        avg_win,
        avg_loss,
        avg_daily: mean(returns),
        largest_win: wins.iter().copied().fold(0.0, f64::max),
        largest_loss: losses.iter().copied().fold(0.0, f64::min),
        var_95_historical: var_95_historical(returns),
        var_95_parametric: var_95_parametric(returns),
        expected_shortfall: expected_shortfall(returns),
        consistency_score: consistency_score(returns, CONSISTENCY_WINDOW),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation with the denominator floored at 1, so a
/// single-element series yields 0 rather than a division by zero.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>()
        / (values.len() - 1).max(1) as f64;
    variance.sqrt()
}

/// Largest peak-to-trough decline of a value series, as a non-negative
/// magnitude.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = 1.0 - v / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Decline from the all-time peak to the final value, signed (<= 0).
pub fn current_drawdown(values: &[f64]) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    let peak = values.iter().copied().fold(f64::MIN, f64::max);
    if peak > 0.0 {
        (last / peak - 1.0).min(0.0)
    } else {
        0.0
    }
}

/// Empirical 5th-percentile loss: the absolute value of the return at index
/// `floor(0.05 * n)` of the ascending-sorted series. Requires at least 20
/// returns, else 0.
pub fn var_95_historical(returns: &[f64]) -> f64 {
    if returns.len() < MIN_TAIL_SAMPLES {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = (0.05 * sorted.len() as f64).floor() as usize;
    sorted[idx].abs()
}

/// Parametric VaR assuming normality: `abs(mean - 1.645 * std)`.
pub fn var_95_parametric(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    (mean(returns) - 1.645 * sample_std(returns)).abs()
}

/// Mean magnitude of the worst `floor(0.05 * n) + 1` returns. Requires at
/// least 20 returns, else 0.
pub fn expected_shortfall(returns: &[f64]) -> f64 {
    if returns.len() < MIN_TAIL_SAMPLES {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let tail = (0.05 * sorted.len() as f64).floor() as usize + 1;
    mean(&sorted[..tail]).abs()
}

/// Pearson correlation between two equal-length return series. 0 when the
/// lengths differ, fewer than 2 points, or either series has zero variance.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut numerator = 0.0;
    let mut sum_sq_a = 0.0;
    let mut sum_sq_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        numerator += da * db;
        sum_sq_a += da * da;
        sum_sq_b += db * db;
    }

    let denominator = (sum_sq_a * sum_sq_b).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Percentage of rolling windows of length `window` whose summed return is
/// positive, over all such windows. 0 when fewer than `window` points.
pub fn consistency_score(returns: &[f64], window: usize) -> f64 {
    if window == 0 || returns.len() < window {
        return 0.0;
    }
    let mut positive = 0usize;
    let mut total = 0usize;
    for chunk in returns.windows(window) {
        total += 1;
        if chunk.iter().sum::<f64>() > 0.0 {
            positive += 1;
        }
    }
    positive as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_returns_yield_zeroed_stats() {
        assert_eq!(compute(&[]), RiskStats::zeroed());
    }

    #[test]
    fn total_return_matches_compounded_index() {
        let returns = vec![0.0, 0.01, -0.02, 0.03];
        let stats = compute(&returns);
        let index = crate::index::build(&returns, crate::index::BASE_INDEX);
        let recovered = index.last().unwrap() / index[0] - 1.0;
        assert!((stats.total_return - recovered).abs() < 1e-12);
    }

    #[test]
    fn drawdown_signs_hold() {
        let returns = vec![0.0, 0.10, -0.20, 0.05];
        let stats = compute(&returns);
        assert!(stats.max_drawdown >= 0.0);
        assert!(stats.current_dd <= 0.0);
        assert!((stats.max_drawdown - 0.20).abs() < 1e-12);
    }

    #[test]
    fn tail_metrics_require_twenty_returns() {
        let returns = vec![-0.5; 19];
        assert_eq!(var_95_historical(&returns), 0.0);
        assert_eq!(expected_shortfall(&returns), 0.0);
    }

    #[test]
    fn historical_var_picks_fifth_percentile_index() {
        // 20 evenly spread returns ascending: floor(20 * 0.05) = 1.
        let returns: Vec<f64> = (0..20).map(|i| -0.05 + i as f64 * 0.005).collect();
        let mut sorted = returns.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert!((var_95_historical(&returns) - sorted[1].abs()).abs() < 1e-12);
    }

    #[test]
    fn expected_shortfall_averages_worst_tail() {
        let mut returns = vec![0.01; 18];
        returns.push(-0.10);
        returns.push(-0.20);
        // floor(20 * 0.05) + 1 = 2 worst returns: -0.20 and -0.10.
        assert!((expected_shortfall(&returns) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn parametric_var_on_constant_series_is_mean_magnitude() {
        let returns = vec![0.01; 5];
        assert!((var_95_parametric(&returns) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn sortino_without_losses_falls_back_to_cagr() {
        let returns = vec![0.01, 0.02, 0.01];
        let stats = compute(&returns);
        assert!((stats.sortino - stats.cagr).abs() < 1e-12);
        assert!(stats.sortino > 0.0);
    }

    #[test]
    fn reward_risk_undefined_without_both_sides() {
        let stats = compute(&[0.01, 0.02]);
        assert_eq!(stats.reward_risk, 0.0);
    }

    #[test]
    fn win_loss_distribution_stats() {
        let stats = compute(&[0.02, -0.01, 0.04, -0.03]);
        assert!((stats.win_rate - 0.5).abs() < 1e-12);
        assert!((stats.avg_win - 0.03).abs() < 1e-12);
        assert!((stats.avg_loss - -0.02).abs() < 1e-12);
        assert!((stats.largest_win - 0.04).abs() < 1e-12);
        assert!((stats.largest_loss - -0.03).abs() < 1e-12);
        assert!((stats.reward_risk - 1.5).abs() < 1e-12);
    }

    #[test]
    fn correlation_of_identical_series_is_one() {
        let a = vec![0.01, -0.02, 0.03, 0.005];
        assert!((correlation(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_degenerate_cases_are_zero() {
        assert_eq!(correlation(&[0.01], &[0.01]), 0.0);
        assert_eq!(correlation(&[0.01, 0.02], &[0.01, 0.02, 0.03]), 0.0);
        assert_eq!(correlation(&[0.0, 0.0, 0.0], &[0.01, 0.02, 0.03]), 0.0);
    }

    #[test]
    fn consistency_needs_a_full_window() {
        let returns = vec![0.01; 29];
        assert_eq!(consistency_score(&returns, 30), 0.0);
        let returns = vec![0.01; 30];
        assert_eq!(consistency_score(&returns, 30), 100.0);
    }

    #[test]
    fn consistency_counts_positive_windows() {
        // Windows of 2 over [1%, 1%, -3%]: [+] then [-].
        assert!((consistency_score(&[0.01, 0.01, -0.03], 2) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn cagr_zero_when_compounded_to_nothing() {
        // A -100% day drives the total factor to zero.
        let stats = compute(&[0.5, -1.0]);
        assert_eq!(stats.cagr, 0.0);
    }
}
