use chrono::{Duration, NaiveDate};

/// Trailing-window return against a target cutoff `days` back from the last
/// date.
///
/// The anchor is the date nearest to `last_date - days` by absolute day
/// difference, with ties resolved in favor of the earliest candidate. A
/// linear scan is fine here: per-request axes are bounded by roughly a year
/// of trading days. Returns 0 when the anchor value is non-positive or the
/// inputs are unusable.
pub fn lookback_return(dates: &[NaiveDate], values: &[f64], days: i64) -> f64 {
    if dates.is_empty() || dates.len() != values.len() {
        return 0.0;
    }
    let Some(&last_date) = dates.last() else {
        return 0.0;
    };
    let cutoff = last_date - Duration::days(days);

    let mut anchor_idx = 0usize;
    let mut best_diff = i64::MAX;
    for (i, date) in dates.iter().enumerate() {
        let diff = (*date - cutoff).num_days().abs();
        // Strict comparison keeps the first of equally-near candidates.
        if diff < best_diff {
            best_diff = diff;
            anchor_idx = i;
        }
    }

    let anchor = values[anchor_idx];
    if anchor > 0.0 {
        values[values.len() - 1] / anchor - 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn exact_cutoff_match_is_selected() {
        let dates = vec![d("2024-01-01"), d("2024-01-05"), d("2024-01-10")];
        let values = vec![100.0, 110.0, 121.0];
        let r = lookback_return(&dates, &values, 5);
        assert!((r - (121.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn nearest_date_wins_when_cutoff_missing() {
        // Cutoff 2024-01-04: the 5th (1 day away) beats the 1st (3 days).
        let dates = vec![d("2024-01-01"), d("2024-01-05"), d("2024-01-10")];
        let values = vec![100.0, 110.0, 121.0];
        let r = lookback_return(&dates, &values, 6);
        assert!((r - (121.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn ties_resolve_to_the_earlier_date() {
        // Cutoff 2024-01-03 is equidistant from the 2nd and the 4th.
        let dates = vec![d("2024-01-02"), d("2024-01-04"), d("2024-01-05")];
        let values = vec![100.0, 200.0, 300.0];
        let r = lookback_return(&dates, &values, 2);
        assert!((r - 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_anchor_yields_zero() {
        let dates = vec![d("2024-01-01"), d("2024-01-02")];
        assert_eq!(lookback_return(&dates, &[0.0, 110.0], 1), 0.0);
    }

    #[test]
    fn empty_or_misaligned_input_yields_zero() {
        assert_eq!(lookback_return(&[], &[], 7), 0.0);
        assert_eq!(lookback_return(&[d("2024-01-01")], &[1.0, 2.0], 7), 0.0);
    }
}
