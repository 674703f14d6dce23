use chrono::NaiveDate;
use std::collections::BTreeMap;

/// The fixed base value every normalized index is anchored to.
pub const BASE_INDEX: f64 = 10_000.0;

/// Compounds a daily-return series into a normalized cumulative index.
///
/// `index[0] = base` and `index[i] = index[i-1] * (1 + returns[i])` for
/// every later entry. The caller supplies returns aligned 1:1 with its date
/// axis, with the first entry conventionally 0.0.
pub fn build(returns: &[f64], base: f64) -> Vec<f64> {
    let mut index = Vec::with_capacity(returns.len());
    let mut current = base;
    for (i, r) in returns.iter().enumerate() {
        if i > 0 {
            current *= 1.0 + r;
        }
        index.push(current);
    }
    index
}

/// Rebases benchmark closing prices onto the portfolio's own index scale.
///
/// The anchor is the first axis date carrying a benchmark observation: every
/// benchmark price is scaled so that the overlay equals the portfolio index
/// on that date, after which the two series diverge only by relative return,
/// not raw units. Axis dates with no observation carry the previous computed
/// value forward unchanged. With no observations at all the overlay is flat
/// at `base`.
pub fn benchmark_overlay(
    axis: &[NaiveDate],
    portfolio_index: &[f64],
    closes: &BTreeMap<NaiveDate, f64>,
    base: f64,
) -> Vec<f64> {
    let anchor = axis
        .iter()
        .enumerate()
        .find_map(|(i, d)| closes.get(d).map(|close| (i, *close)));

    let Some((anchor_idx, anchor_close)) = anchor else {
        return vec![base; axis.len()];
    };
    if anchor_close <= 0.0 {
        return vec![base; axis.len()];
    }
    let anchor_value = portfolio_index.get(anchor_idx).copied().unwrap_or(base);

    let mut overlay = Vec::with_capacity(axis.len());
    let mut current = anchor_value;
    for date in axis {
        if let Some(close) = closes.get(date) {
            current = anchor_value * close / anchor_close;
        }
        overlay.push(current);
    }
    overlay
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn build_compounds_from_base() {
        let index = build(&[0.0, 0.10, -0.05], BASE_INDEX);
        assert_eq!(index[0], 10_000.0);
        assert!((index[1] - 11_000.0).abs() < 1e-9);
        assert!((index[2] - 10_450.0).abs() < 1e-9);
    }

    #[test]
    fn build_of_empty_returns_is_empty() {
        assert!(build(&[], BASE_INDEX).is_empty());
    }

    #[test]
    fn index_recovers_total_return() {
        let returns = vec![0.0, 0.02, -0.01, 0.03];
        let index = build(&returns, BASE_INDEX);
        let recovered = index.last().unwrap() / index[0] - 1.0;
        let total: f64 = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
        assert!((recovered - total).abs() < 1e-12);
    }

    #[test]
    fn overlay_anchors_to_portfolio_index() {
        let axis = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let portfolio = vec![10_000.0, 10_100.0, 10_200.0];
        let mut closes = BTreeMap::new();
        closes.insert(d("2024-01-02"), 400.0);
        closes.insert(d("2024-01-03"), 410.0);

        let overlay = benchmark_overlay(&axis, &portfolio, &closes, BASE_INDEX);
        // Flat at the anchor value before the first observation.
        assert!((overlay[0] - 10_100.0).abs() < 1e-9);
        assert!((overlay[1] - 10_100.0).abs() < 1e-9);
        assert!((overlay[2] - 10_100.0 * 410.0 / 400.0).abs() < 1e-9);
    }

    #[test]
    fn overlay_carries_forward_over_gaps() {
        let axis = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let portfolio = vec![10_000.0, 10_000.0, 10_000.0];
        let mut closes = BTreeMap::new();
        closes.insert(d("2024-01-01"), 100.0);
        closes.insert(d("2024-01-03"), 110.0);

        let overlay = benchmark_overlay(&axis, &portfolio, &closes, BASE_INDEX);
        assert!((overlay[0] - 10_000.0).abs() < 1e-9);
        // No observation on the 2nd: flat interpolation, not a missing value.
        assert!((overlay[1] - 10_000.0).abs() < 1e-9);
        assert!((overlay[2] - 11_000.0).abs() < 1e-9);
    }

    #[test]
    fn overlay_without_observations_is_flat_base() {
        let axis = vec![d("2024-01-01"), d("2024-01-02")];
        let overlay = benchmark_overlay(&axis, &[10_000.0, 10_500.0], &BTreeMap::new(), BASE_INDEX);
        assert_eq!(overlay, vec![BASE_INDEX, BASE_INDEX]);
    }
}
