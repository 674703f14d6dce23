use chrono::NaiveDate;
use core_types::{DailySeries, StrategySnapshot};
use std::collections::HashMap;

/// Computes the blended portfolio daily return series over a date axis.
///
/// Index 0 is always 0.0 (there is no prior day to compare against); entry
/// `i` is the market-value-weighted return over the transition from
/// `axis[i-1]` to `axis[i]`.
pub fn portfolio_daily_returns(axis: &[NaiveDate], series: &[DailySeries]) -> Vec<f64> {
    let mut returns = vec![0.0; axis.len()];
    for i in 1..axis.len() {
        returns[i] = transition_return(axis[i - 1], axis[i], series);
    }
    returns
}

/// The market-value-weighted average return across strategies for one date
/// transition.
///
/// Each strategy contributes its own deposit-adjusted return over the
/// transition, weighted by its prior-day market value. Strategies of
/// different capital size therefore contribute proportionally, which a plain
/// arithmetic mean would not achieve. A strategy is excluded when it lacks a
/// record on either endpoint, or when its prior deposit-adjusted value or
/// prior market value is non-positive. Zero total weight yields 0.0, never a
/// division error.
pub fn transition_return(prev: NaiveDate, curr: NaiveDate, series: &[DailySeries]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for s in series {
        let (Some(i_prev), Some(i_curr)) = (s.position(prev), s.position(curr)) else {
            continue;
        };
        let Some(depo_prev) = s.deposit_adjusted_at(i_prev) else {
            continue;
        };
        if depo_prev <= 0.0 {
            continue;
        }
        let Some(depo_curr) = s.deposit_adjusted_at(i_curr) else {
            continue;
        };
        let Some(weight) = s.market_value_at(i_prev) else {
            tracing::debug!(strategy = s.strategy_id(), date = %prev, "no prior market value, excluding from transition");
            continue;
        };
        if weight <= 0.0 {
            continue;
        }

        let r = depo_curr / depo_prev - 1.0;
        weighted_sum += weight * r;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    }
}

/// The same weighted-return formula for a day the provider has not yet
/// finalized.
///
/// Each strategy's current snapshot stands in for the missing daily record,
/// compared against its last *completed* record on `last_completed`. Returns
/// `None` when no strategy contributes valid weight, so the caller can skip
/// the intraday point entirely.
pub fn intraday_return(
    series: &[DailySeries],
    snapshots: &[StrategySnapshot],
    last_completed: NaiveDate,
) -> Option<f64> {
    let current: HashMap<&str, &StrategySnapshot> = snapshots
        .iter()
        .filter(|s| s.deposit_adjusted_value.is_some() && s.market_value.is_some())
        .map(|s| (s.id.as_str(), s))
        .collect();

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for s in series {
        let Some(snapshot) = current.get(s.strategy_id()) else {
            continue;
        };
        let Some(i_prev) = s.position(last_completed) else {
            continue;
        };
        let Some(depo_prev) = s.deposit_adjusted_at(i_prev) else {
            continue;
        };
        let Some(weight) = s.market_value_at(i_prev) else {
            continue;
        };
        if depo_prev <= 0.0 || weight <= 0.0 {
            continue;
        }
        // Presence checked when building the snapshot map.
        let Some(depo_now) = snapshot.deposit_adjusted_value else {
            continue;
        };

        let r = depo_now / depo_prev - 1.0;
        weighted_sum += weight * r;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        Some(weighted_sum / total_weight)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(id: &str, depo: Vec<f64>, value: Vec<Option<f64>>) -> DailySeries {
        let dates = vec![d("2024-01-01"), d("2024-01-02")];
        DailySeries::new(id, dates, depo, value).unwrap()
    }

    #[test]
    fn single_strategy_degenerates_to_its_own_return() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1100.0)]);
        let r = transition_return(d("2024-01-01"), d("2024-01-02"), &[a]);
        assert!((r - 0.10).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_strategy_contributes_nothing() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1000.0)]);
        let b = series("b", vec![50.0, 45.0], vec![Some(0.0), Some(0.0)]);
        let r = transition_return(d("2024-01-01"), d("2024-01-02"), &[a, b]);
        assert!((r - 0.10).abs() < 1e-12);
    }

    #[test]
    fn all_invalid_weights_yield_exactly_zero() {
        let a = series("a", vec![100.0, 110.0], vec![Some(0.0), Some(0.0)]);
        let b = series("b", vec![100.0, 90.0], vec![None, None]);
        let r = transition_return(d("2024-01-01"), d("2024-01-02"), &[a, b]);
        assert_eq!(r, 0.0);
    }

    #[test]
    fn weights_blend_proportionally_to_capital() {
        // 3000 at +10% and 1000 at -10% -> +5%.
        let a = series("a", vec![100.0, 110.0], vec![Some(3000.0), Some(3300.0)]);
        let b = series("b", vec![200.0, 180.0], vec![Some(1000.0), Some(900.0)]);
        let r = transition_return(d("2024-01-01"), d("2024-01-02"), &[a, b]);
        assert!((r - 0.05).abs() < 1e-12);
    }

    #[test]
    fn missing_endpoint_record_excludes_strategy() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1100.0)]);
        let b = DailySeries::new(
            "b",
            vec![d("2024-01-01")],
            vec![200.0],
            vec![Some(5000.0)],
        )
        .unwrap();
        let r = transition_return(d("2024-01-01"), d("2024-01-02"), &[a, b]);
        assert!((r - 0.10).abs() < 1e-12);
    }

    #[test]
    fn first_axis_entry_has_zero_return() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1100.0)]);
        let axis = vec![d("2024-01-01"), d("2024-01-02")];
        let returns = portfolio_daily_returns(&axis, &[a]);
        assert_eq!(returns[0], 0.0);
        assert!((returns[1] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn intraday_uses_snapshot_against_last_completed_record() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1100.0)]);
        let snapshots = vec![StrategySnapshot {
            id: "a".to_string(),
            name: "Alpha".to_string(),
            market_value: Some(1150.0),
            deposit_adjusted_value: Some(115.5),
            net_deposits: None,
            holdings: vec![],
        }];
        let r = intraday_return(&[a], &snapshots, d("2024-01-02")).unwrap();
        assert!((r - 0.05).abs() < 1e-12);
    }

    #[test]
    fn intraday_without_valid_snapshots_is_none() {
        let a = series("a", vec![100.0, 110.0], vec![Some(1000.0), Some(1100.0)]);
        let snapshots = vec![StrategySnapshot {
            id: "a".to_string(),
            name: "Alpha".to_string(),
            market_value: None,
            deposit_adjusted_value: Some(115.5),
            net_deposits: None,
            holdings: vec![],
        }];
        assert_eq!(intraday_return(&[a], &snapshots, d("2024-01-02")), None);
    }
}
