use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One strategy's daily performance history, ordered by date.
///
/// Each record carries two values: the deposit-adjusted value, which has
/// external cash flows removed and is used purely to derive returns, and the
/// market value, the actual dollar size of the strategy, used as the weight
/// when blending several strategies into one portfolio return.
///
/// The series is immutable once built and carries a precomputed date-to-index
/// map so that alignment across strategies can look up any date in O(1).
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    strategy_id: String,
    dates: Vec<NaiveDate>,
    deposit_adjusted: Vec<f64>,
    market_value: Vec<Option<f64>>,
    index: HashMap<NaiveDate, usize>,
}

impl DailySeries {
    /// Builds a series from index-aligned columns.
    ///
    /// The three columns must have the same length and dates must not repeat.
    pub fn new(
        strategy_id: impl Into<String>,
        dates: Vec<NaiveDate>,
        deposit_adjusted: Vec<f64>,
        market_value: Vec<Option<f64>>,
    ) -> Result<Self, CoreError> {
        let strategy_id = strategy_id.into();
        if dates.len() != deposit_adjusted.len() || dates.len() != market_value.len() {
            return Err(CoreError::InvalidInput(
                "DailySeries".to_string(),
                format!(
                    "misaligned columns for strategy {}: {} dates, {} deposit-adjusted, {} market values",
                    strategy_id,
                    dates.len(),
                    deposit_adjusted.len(),
                    market_value.len()
                ),
            ));
        }

        let mut index = HashMap::with_capacity(dates.len());
        for (i, date) in dates.iter().enumerate() {
            if index.insert(*date, i).is_some() {
                return Err(CoreError::InvalidInput(
                    "DailySeries".to_string(),
                    format!("duplicate date {} for strategy {}", date, strategy_id),
                ));
            }
        }

        Ok(Self {
            strategy_id,
            dates,
            deposit_adjusted,
            market_value,
            index,
        })
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn deposit_adjusted(&self) -> &[f64] {
        &self.deposit_adjusted
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// O(1) lookup from a calendar date to this series' local index.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.index.get(&date).copied()
    }

    pub fn deposit_adjusted_at(&self, idx: usize) -> Option<f64> {
        self.deposit_adjusted.get(idx).copied()
    }

    pub fn market_value_at(&self, idx: usize) -> Option<f64> {
        self.market_value.get(idx).copied().flatten()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// The provider's current view of one strategy, as reported by the
/// account-level aggregate stats payload.
///
/// The snapshot values are fresher than the last completed daily record and
/// drive the intraday augmentation of the portfolio index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    pub id: String,
    pub name: String,
    /// Current total dollar value of the strategy.
    pub market_value: Option<f64>,
    /// Current deposit-adjusted value of the strategy.
    pub deposit_adjusted_value: Option<f64>,
    pub net_deposits: Option<f64>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

/// A single position held inside a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub value: f64,
    pub amount: f64,
    pub allocation: Option<f64>,
}

/// Caller credentials for the trading-data provider.
///
/// Extracted from the incoming request once and threaded explicitly through
/// every provider call; there is no ambient authentication state anywhere in
/// the system.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    /// The full `Authorization` header value, e.g. `Basic dXNlcjpwYXNz`.
    pub authorization: String,
    /// Optional provider environment selector.
    pub environment: Option<String>,
}

impl Credentials {
    pub fn new(authorization: impl Into<String>, environment: Option<String>) -> Self {
        Self {
            authorization: authorization.into(),
            environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn daily_series_rejects_misaligned_columns() {
        let result = DailySeries::new(
            "s1",
            vec![d("2024-01-01"), d("2024-01-02")],
            vec![100.0],
            vec![Some(1000.0), Some(1000.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn daily_series_rejects_duplicate_dates() {
        let result = DailySeries::new(
            "s1",
            vec![d("2024-01-01"), d("2024-01-01")],
            vec![100.0, 101.0],
            vec![Some(1000.0), Some(1000.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn daily_series_position_lookup() {
        let series = DailySeries::new(
            "s1",
            vec![d("2024-01-01"), d("2024-01-02")],
            vec![100.0, 110.0],
            vec![Some(1000.0), None],
        )
        .unwrap();

        assert_eq!(series.position(d("2024-01-02")), Some(1));
        assert_eq!(series.position(d("2024-01-03")), None);
        assert_eq!(series.deposit_adjusted_at(1), Some(110.0));
        assert_eq!(series.market_value_at(0), Some(1000.0));
        assert_eq!(series.market_value_at(1), None);
    }
}
