use chrono::NaiveDate;
use core_types::DailySeries;
use std::collections::{BTreeSet, HashMap};

/// Two value series aligned onto their common, sorted date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub dates: Vec<NaiveDate>,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

/// Returns the sorted union of all dates appearing in any input series.
///
/// A date only needs to be present in one series to make it onto the axis;
/// strategies with no record on a given date are simply excluded from that
/// date's aggregation later on. An empty input yields an empty axis.
pub fn union_axis(series: &[DailySeries]) -> Vec<NaiveDate> {
    let mut axis: BTreeSet<NaiveDate> = BTreeSet::new();
    for s in series {
        axis.extend(s.dates().iter().copied());
    }
    axis.into_iter().collect()
}

/// Aligns two date/value series onto the sorted intersection of their dates.
///
/// Used for live-vs-backtest comparison, where a date must carry an
/// observation on both sides to be comparable. No common dates yields an
/// empty pair rather than an error.
pub fn intersection_align(
    left_dates: &[NaiveDate],
    left_values: &[f64],
    right_dates: &[NaiveDate],
    right_values: &[f64],
) -> AlignedPair {
    let left_map: HashMap<NaiveDate, f64> = left_dates
        .iter()
        .copied()
        .zip(left_values.iter().copied())
        .collect();
    let right_map: HashMap<NaiveDate, f64> = right_dates
        .iter()
        .copied()
        .zip(right_values.iter().copied())
        .collect();

    let common: BTreeSet<NaiveDate> = left_dates
        .iter()
        .filter(|d| right_map.contains_key(d))
        .copied()
        .collect();

    let mut dates = Vec::with_capacity(common.len());
    let mut left = Vec::with_capacity(common.len());
    let mut right = Vec::with_capacity(common.len());
    for date in common {
        // Both lookups are guaranteed by construction of `common`.
        if let (Some(l), Some(r)) = (left_map.get(&date), right_map.get(&date)) {
            dates.push(date);
            left.push(*l);
            right.push(*r);
        }
    }

    AlignedPair { dates, left, right }
}
