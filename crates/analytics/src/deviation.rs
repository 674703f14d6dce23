use crate::align;
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Deviation metrics between a strategy's live performance and its backtest
/// over the same period.
///
/// `ldr` (live-drift risk) is a composite 0-100 score blending return-space
/// error magnitude and directional similarity; it is duplicated as
/// `risk_score` in the serialized output for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationMetrics {
    /// Annualized standard deviation of the live-minus-backtest return
    /// differences.
    pub tracking_error: f64,
    pub correlation: f64,
    /// Root-mean-square error between aligned raw values.
    pub rmse: f64,
    /// Root-mean-square error between the two return series; scale-invariant.
    pub rmse_returns: f64,
    pub max_deviation: f64,
    pub mean_deviation: f64,
    pub cumulative_return_deviation: f64,
    pub ldr: f64,
    pub risk_score: f64,
    pub num_data_points: usize,
}

impl DeviationMetrics {
    pub fn zeroed() -> Self {
        Self {
            tracking_error: 0.0,
            correlation: 0.0,
            rmse: 0.0,
            rmse_returns: 0.0,
            max_deviation: 0.0,
            mean_deviation: 0.0,
            cumulative_return_deviation: 0.0,
            ldr: 0.0,
            risk_score: 0.0,
            num_data_points: 0,
        }
    }
}

/// Simple daily returns from a value series, length `n - 1`.
///
/// A non-positive prior value contributes a return of 0 rather than a
/// division error.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Compares live and backtest value series after intersection alignment.
///
/// Fewer than 2 aligned dates yields an all-zero result with
/// `num_data_points = 0`, so callers can tell "no overlap" apart from
/// "perfect tracking".
pub fn compute(
    live_dates: &[NaiveDate],
    live_values: &[f64],
    backtest_dates: &[NaiveDate],
    backtest_values: &[f64],
) -> DeviationMetrics {
    let pair = align::intersection_align(live_dates, live_values, backtest_dates, backtest_values);
    if pair.dates.len() < 2 {
        return DeviationMetrics::zeroed();
    }

    let live_returns = daily_returns(&pair.left);
    let backtest_returns = daily_returns(&pair.right);

    let diffs: Vec<f64> = live_returns
        .iter()
        .zip(backtest_returns.iter())
        .map(|(l, b)| l - b)
        .collect();
    let tracking_error = stats::sample_std(&diffs) * stats::ANNUAL_DAYS.sqrt();
    let correlation = stats::correlation(&live_returns, &backtest_returns);
    let rmse = root_mean_square_error(&pair.left, &pair.right);
    let rmse_returns = root_mean_square_error(&live_returns, &backtest_returns);
    let (max_deviation, mean_deviation) = percentage_deviations(&pair.left, &pair.right);

    let ldr = (rmse_returns * 100.0 * (2.0 - correlation) * 100.0).min(100.0);

    DeviationMetrics {
        tracking_error,
        correlation,
        rmse,
        rmse_returns,
        max_deviation,
        mean_deviation,
        cumulative_return_deviation: cumulative_return_deviation(&pair.left, &pair.right),
        ldr,
        risk_score: ldr,
        num_data_points: pair.dates.len(),
    }
}

fn root_mean_square_error(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mse = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        / a.len() as f64;
    mse.sqrt()
}

/// Max and mean of `|live - backtest| / backtest` over aligned points where
/// the backtest value is positive.
fn percentage_deviations(live: &[f64], backtest: &[f64]) -> (f64, f64) {
    let mut max_dev = 0.0;
    let mut sum = 0.0;
    let mut count = 0usize;
    for (l, b) in live.iter().zip(backtest.iter()) {
        if *b > 0.0 {
            let dev = ((l - b) / b).abs();
            if dev > max_dev {
                max_dev = dev;
            }
            sum += dev;
            count += 1;
        }
    }
    let mean_dev = if count > 0 { sum / count as f64 } else { 0.0 };
    (max_dev, mean_dev)
}

fn cumulative_return_deviation(live: &[f64], backtest: &[f64]) -> f64 {
    if live.len() < 2 || backtest.len() < 2 {
        return 0.0;
    }
    if live[0] <= 0.0 || backtest[0] <= 0.0 {
        return 0.0;
    }
    let live_total = live[live.len() - 1] / live[0] - 1.0;
    let backtest_total = backtest[backtest.len() - 1] / backtest[0] - 1.0;
    live_total - backtest_total
}

/// Buckets a 0-100 drift score into a label and a caller-facing description.
pub fn risk_level(score: f64) -> (&'static str, &'static str) {
    if score < 20.0 {
        ("Low", "Live performance closely tracks backtest")
    } else if score < 40.0 {
        ("Moderate", "Some deviation from backtest, monitor closely")
    } else if score < 60.0 {
        (
            "Elevated",
            "Significant deviation from backtest, consider reviewing strategy",
        )
    } else {
        (
            "High",
            "Large deviation from backtest, may indicate high risk or changed market conditions",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        (1..=n)
            .map(|i| d(&format!("2024-01-{i:02}")))
            .collect()
    }

    #[test]
    fn identical_series_produce_zero_drift() {
        let axis = dates(5);
        let values = vec![100.0, 101.0, 99.0, 102.0, 103.0];
        let m = compute(&axis, &values, &axis, &values);

        assert_eq!(m.tracking_error, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.rmse_returns, 0.0);
        assert_eq!(m.max_deviation, 0.0);
        assert_eq!(m.mean_deviation, 0.0);
        assert_eq!(m.ldr, 0.0);
        assert_eq!(m.num_data_points, 5);
        assert!((m.correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn too_little_overlap_is_all_zero_with_no_points() {
        let m = compute(
            &[d("2024-01-01"), d("2024-01-02")],
            &[100.0, 101.0],
            &[d("2024-01-02"), d("2024-01-03")],
            &[100.0, 101.0],
        );
        assert_eq!(m, DeviationMetrics::zeroed());
        assert_eq!(m.num_data_points, 0);
    }

    #[test]
    fn daily_returns_guard_non_positive_priors() {
        let returns = daily_returns(&[100.0, 0.0, 50.0]);
        assert_eq!(returns, vec![-1.0, 0.0]);
        assert!(daily_returns(&[100.0]).is_empty());
    }

    #[test]
    fn ldr_is_capped_at_one_hundred() {
        let axis = dates(4);
        let live = vec![100.0, 200.0, 50.0, 300.0];
        let backtest = vec![100.0, 50.0, 200.0, 20.0];
        let m = compute(&axis, &live, &axis, &backtest);
        assert_eq!(m.ldr, 100.0);
        assert_eq!(m.risk_score, m.ldr);
    }

    #[test]
    fn cumulative_deviation_is_difference_of_totals() {
        let axis = dates(3);
        let live = vec![100.0, 105.0, 110.0];
        let backtest = vec![100.0, 102.0, 105.0];
        let m = compute(&axis, &live, &axis, &backtest);
        assert!((m.cumulative_return_deviation - 0.05).abs() < 1e-12);
    }

    #[test]
    fn risk_buckets_cover_the_scale() {
        assert_eq!(risk_level(0.0).0, "Low");
        assert_eq!(risk_level(25.0).0, "Moderate");
        assert_eq!(risk_level(45.0).0, "Elevated");
        assert_eq!(risk_level(60.0).0, "High");
    }
}
