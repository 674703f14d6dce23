use crate::error::ApiError;
use chrono::NaiveDate;
use core_types::{DailySeries, Holding, StrategySnapshot};
use serde::Deserialize;

/// The provider's account listing.
#[derive(Debug, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<AccountRef>,
}

#[derive(Debug, Deserialize)]
pub struct AccountRef {
    pub account_uuid: String,
}

/// The per-account aggregate stats payload, carrying one entry per strategy.
#[derive(Debug, Deserialize)]
pub struct StrategyListResponse {
    #[serde(default)]
    pub strategies: Vec<RawStrategy>,
}

/// One strategy as reported by the aggregate stats payload. Field names vary
/// across provider versions, hence the aliases.
#[derive(Debug, Deserialize)]
pub struct RawStrategy {
    #[serde(alias = "strategy_id")]
    pub id: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default, alias = "total_value", alias = "portfolio_value")]
    pub value: Option<f64>,
    #[serde(default)]
    pub deposit_adjusted_value: Option<f64>,
    #[serde(default)]
    pub net_deposits: Option<f64>,
    #[serde(default)]
    pub holdings: Vec<RawHolding>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RawHolding {
    pub ticker: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub allocation: Option<f64>,
}

impl From<RawStrategy> for StrategySnapshot {
    fn from(raw: RawStrategy) -> Self {
        StrategySnapshot {
            id: raw.id,
            name: raw.name,
            market_value: raw.value,
            deposit_adjusted_value: raw.deposit_adjusted_value,
            net_deposits: raw.net_deposits,
            holdings: raw
                .holdings
                .into_iter()
                .map(|h| Holding {
                    ticker: h.ticker,
                    value: h.value,
                    amount: h.amount,
                    allocation: h.allocation,
                })
                .collect(),
        }
    }
}

/// A strategy's raw daily performance payload.
#[derive(Debug, Deserialize)]
pub struct RawDailyPerformance {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub deposit_adjusted_series: Vec<f64>,
    /// Market values; may be absent entirely on older provider versions.
    #[serde(default)]
    pub series: Vec<Option<f64>>,
}

impl RawDailyPerformance {
    /// Converts the loose payload into a strongly-typed `DailySeries`.
    ///
    /// Absence of dates or the deposit-adjusted series disqualifies the
    /// strategy for this request. Records with unparsable dates are dropped
    /// rather than failing the whole series; a missing market-value column
    /// becomes all-`None` weights, which the aggregator treats as zero
    /// contribution.
    pub fn into_daily_series(self, strategy_id: &str) -> Result<DailySeries, ApiError> {
        if self.dates.is_empty() || self.deposit_adjusted_series.is_empty() {
            return Err(ApiError::InvalidData(format!(
                "strategy {strategy_id} has no dates or deposit-adjusted series"
            )));
        }
        if self.dates.len() != self.deposit_adjusted_series.len() {
            return Err(ApiError::InvalidData(format!(
                "strategy {strategy_id} has misaligned performance arrays"
            )));
        }

        let mut dates = Vec::with_capacity(self.dates.len());
        let mut deposit_adjusted = Vec::with_capacity(self.dates.len());
        let mut market_value = Vec::with_capacity(self.dates.len());
        for (i, raw_date) in self.dates.iter().enumerate() {
            let Ok(date) = raw_date.parse::<NaiveDate>() else {
                tracing::debug!(strategy = strategy_id, date = %raw_date, "skipping unparsable date");
                continue;
            };
            dates.push(date);
            deposit_adjusted.push(self.deposit_adjusted_series[i]);
            market_value.push(self.series.get(i).copied().flatten());
        }

        DailySeries::new(strategy_id, dates, deposit_adjusted, market_value)
            .map_err(|e| ApiError::InvalidData(e.to_string()))
    }
}

/// A backtest simulation payload: daily cumulative-return percentages from
/// the start of the simulated period.
#[derive(Debug, Deserialize)]
pub struct RawBacktest {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub cumulative_return_pct: Vec<Option<f64>>,
}

/// A backtest converted to dollar values on its own date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl RawBacktest {
    /// Converts cumulative-return percentages into values starting from
    /// `capital`, so the backtest is directly comparable to a live value
    /// series. Missing percentages fall back to the starting capital.
    pub fn into_series(self, capital: f64) -> Result<BacktestSeries, ApiError> {
        if self.dates.is_empty() {
            return Err(ApiError::InvalidData(
                "backtest returned no dates".to_string(),
            ));
        }

        let mut dates = Vec::with_capacity(self.dates.len());
        let mut values = Vec::with_capacity(self.dates.len());
        for (i, raw_date) in self.dates.iter().enumerate() {
            let Ok(date) = raw_date.parse::<NaiveDate>() else {
                continue;
            };
            let value = match self.cumulative_return_pct.get(i).copied().flatten() {
                Some(pct) => capital * (1.0 + pct / 100.0),
                None => capital,
            };
            dates.push(date);
            values.push(value);
        }

        if dates.is_empty() {
            return Err(ApiError::InvalidData(
                "backtest returned no parseable dates".to_string(),
            ));
        }
        Ok(BacktestSeries { dates, values })
    }
}
