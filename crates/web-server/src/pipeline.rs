use crate::AppState;
use crate::error::AppError;
use analytics::deviation::{self, DeviationMetrics};
use analytics::{AnalyticsError, aggregate, align, index, lookback::lookback_return, stats};
use api_client::error::ApiError;
use chrono::{NaiveDate, Utc};
use core_types::{Credentials, DailySeries, StrategySnapshot};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

// ==============================================================================
// Response Shapes
// ==============================================================================

/// One row of the blended chart: portfolio and benchmark on the same
/// normalized scale.
#[derive(Debug, Serialize)]
pub struct ChartRow {
    /// "MM-DD", the provider UI's axis label format.
    pub date: String,
    pub portfolio: i64,
    pub sp500: i64,
}

#[derive(Debug, Serialize)]
pub struct LookbackReturns {
    pub today: f64,
    #[serde(rename = "7d")]
    pub seven_days: f64,
    #[serde(rename = "30d")]
    pub thirty_days: f64,
    #[serde(rename = "90d")]
    pub ninety_days: f64,
    #[serde(rename = "1y")]
    pub one_year: f64,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct LookbackBlock {
    pub portfolio: LookbackReturns,
    pub sp500: LookbackReturns,
}

#[derive(Debug, Serialize)]
pub struct PerformanceStats {
    #[serde(flatten)]
    pub core: stats::RiskStats,
    pub lookbacks: LookbackBlock,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub data: Vec<ChartRow>,
    pub stats: PerformanceStats,
}

#[derive(Debug, Serialize)]
pub struct RiskResponse {
    pub total_value: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub correlation_with_benchmark: f64,
    pub consistency: f64,
    pub var_95_historical: f64,
    pub var_95_parametric: f64,
    pub expected_shortfall: f64,
    pub var_95_dollar_historical: f64,
    pub var_95_dollar_parametric: f64,
    pub expected_shortfall_dollar: f64,
}

#[derive(Debug, Serialize)]
pub struct MetricRow {
    pub metric: &'static str,
    pub benchmark: String,
    pub portfolio: String,
}

#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub metrics: Vec<MetricRow>,
}

#[derive(Debug, Serialize)]
pub struct AllocationItem {
    pub symbol: String,
    pub quantity: f64,
    pub market_value: f64,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub items: Vec<AllocationItem>,
    pub total_value: f64,
}

#[derive(Debug, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
}

#[derive(Debug, Serialize)]
pub struct DeviationBlock {
    #[serde(flatten)]
    pub metrics: DeviationMetrics,
    pub risk_level: &'static str,
    pub risk_description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeviationSummary {
    pub live_cumulative_return: f64,
    pub backtest_cumulative_return: f64,
    pub tracking_error_annualized_pct: f64,
    pub correlation: f64,
}

#[derive(Debug, Serialize)]
pub struct ComparisonRow {
    pub date: NaiveDate,
    pub live: f64,
    pub backtest: f64,
    pub deviation_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct DeviationReport {
    pub strategy_id: String,
    pub period: Period,
    pub deviation_metrics: DeviationBlock,
    pub summary: DeviationSummary,
    pub comparison_data: Vec<ComparisonRow>,
}

#[derive(Debug, Serialize)]
pub struct StrategyDrift {
    pub strategy_id: String,
    pub strategy_name: String,
    pub risk_score: f64,
    pub risk_level: &'static str,
    pub tracking_error_annualized_pct: f64,
    pub correlation: f64,
    pub mean_deviation_pct: f64,
    pub max_deviation_pct: f64,
    pub live_return_pct: f64,
    pub backtest_return_pct: f64,
    pub return_difference_pct: f64,
    pub period_days: usize,
    pub current_value: f64,
}

#[derive(Debug, Serialize)]
pub struct RiskLevelCounts {
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Moderate")]
    pub moderate: usize,
    #[serde(rename = "Elevated")]
    pub elevated: usize,
    #[serde(rename = "High")]
    pub high: usize,
}

#[derive(Debug, Serialize)]
pub struct PortfolioDriftSummary {
    pub total_strategies: usize,
    pub total_portfolio_value: f64,
    pub weighted_avg_risk_score: f64,
    pub risk_level_counts: RiskLevelCounts,
    pub avg_tracking_error_pct: f64,
    pub avg_correlation: f64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioDriftResponse {
    pub portfolio_summary: PortfolioDriftSummary,
    pub strategies: Vec<StrategyDrift>,
}

// ==============================================================================
// Portfolio Pipeline
// ==============================================================================

/// Blends every strategy in the account into one normalized portfolio series
/// with a benchmark overlay, plus the full stats and lookback block.
pub async fn portfolio_performance(
    state: &AppState,
    creds: &Credentials,
    account: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<PerformanceResponse, AppError> {
    let snapshots = state.provider.list_strategies(creds, account).await?;
    let series = fetch_all_series(state, creds, account, &snapshots).await;

    let mut axis = align::union_axis(&series);
    if axis.is_empty() {
        return Err(AnalyticsError::NoData(
            "no strategy performance data for this account".to_string(),
        )
        .into());
    }

    if start.is_some() || end.is_some() {
        let filtered: Vec<NaiveDate> = axis
            .iter()
            .copied()
            .filter(|d| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e))
            .collect();
        // An over-narrow filter falls back to the full axis rather than 404.
        if !filtered.is_empty() {
            axis = filtered;
        }
    }

    let mut returns = aggregate::portfolio_daily_returns(&axis, &series);
    let mut portfolio = index::build(&returns, index::BASE_INDEX);

    // The provider may zero out the current day's record mid-session, so the
    // last point is always recomputed (or appended) from the fresher
    // snapshots when they carry enough data.
    let today = Utc::now().date_naive();
    let mut intraday = None;
    let last_completed = match axis.last() {
        Some(&last) if last == today && axis.len() >= 2 => axis[axis.len() - 2],
        Some(&last) => last,
        None => today,
    };
    if let Some(r) = aggregate::intraday_return(&series, &snapshots, last_completed) {
        intraday = Some(r);
        if axis.last() == Some(&today) {
            if portfolio.len() >= 2 {
                let n = portfolio.len();
                returns[n - 1] = r;
                portfolio[n - 1] = portfolio[n - 2] * (1.0 + r);
            }
        } else {
            axis.push(today);
            returns.push(r);
            let last = portfolio.last().copied().unwrap_or(index::BASE_INDEX);
            portfolio.push(last * (1.0 + r));
        }
    }

    let closes = fetch_benchmark_closes(state, &axis).await;
    let overlay = index::benchmark_overlay(&axis, &portfolio, &closes, index::BASE_INDEX);

    let data = axis
        .iter()
        .zip(portfolio.iter().zip(overlay.iter()))
        .map(|(date, (p, b))| ChartRow {
            date: date.format("%m-%d").to_string(),
            portfolio: p.round() as i64,
            sp500: b.round() as i64,
        })
        .collect();

    let core = stats::compute_with_values(&returns[1..], &portfolio);

    let portfolio_today = intraday.unwrap_or_else(|| latest_return(&portfolio));
    let benchmark_today = {
        let close_values: Vec<f64> = closes.values().copied().collect();
        latest_return(&close_values)
    };
    let lookbacks = LookbackBlock {
        portfolio: lookback_set(&axis, &portfolio, portfolio_today),
        sp500: lookback_set(&axis, &overlay, benchmark_today),
    };

    Ok(PerformanceResponse {
        data,
        stats: PerformanceStats { core, lookbacks },
    })
}

/// Detailed portfolio risk metrics, including dollar-scaled VaR.
pub async fn portfolio_risk(
    state: &AppState,
    creds: &Credentials,
    account: &str,
) -> Result<RiskResponse, AppError> {
    let snapshots = state.provider.list_strategies(creds, account).await?;
    let total_value: f64 = snapshots.iter().filter_map(|s| s.market_value).sum();

    let series = fetch_all_series(state, creds, account, &snapshots).await;
    let axis = align::union_axis(&series);
    if axis.is_empty() {
        return Err(AnalyticsError::NoData(
            "no strategy performance data for this account".to_string(),
        )
        .into());
    }

    let full_returns = aggregate::portfolio_daily_returns(&axis, &series);
    let returns = &full_returns[1..];
    let core = stats::compute(returns);

    // Correlation against the benchmark over the overlapping tail of the two
    // return series.
    let closes = fetch_benchmark_closes(state, &axis).await;
    let close_values: Vec<f64> = closes.values().copied().collect();
    let benchmark_returns = deviation::daily_returns(&close_values);
    let overlap = returns.len().min(benchmark_returns.len());
    let correlation = stats::correlation(
        &returns[returns.len() - overlap..],
        &benchmark_returns[benchmark_returns.len() - overlap..],
    );

    Ok(RiskResponse {
        total_value,
        volatility: core.ann_std,
        sharpe_ratio: core.sharpe,
        max_drawdown: core.max_drawdown,
        correlation_with_benchmark: correlation,
        consistency: core.consistency_score,
        var_95_historical: core.var_95_historical,
        var_95_parametric: core.var_95_parametric,
        expected_shortfall: core.expected_shortfall,
        var_95_dollar_historical: total_value * core.var_95_historical,
        var_95_dollar_parametric: total_value * core.var_95_parametric,
        expected_shortfall_dollar: total_value * core.expected_shortfall,
    })
}

/// Side-by-side formatted metric table, portfolio vs benchmark, over the
/// portfolio's own date range.
pub async fn risk_comparison(
    state: &AppState,
    creds: &Credentials,
    account: &str,
) -> Result<ComparisonResponse, AppError> {
    let snapshots = state.provider.list_strategies(creds, account).await?;
    let series = fetch_all_series(state, creds, account, &snapshots).await;
    let axis = align::union_axis(&series);
    let (Some(&first), Some(&last)) = (axis.first(), axis.last()) else {
        return Err(AnalyticsError::NoData(
            "no strategy performance data for this account".to_string(),
        )
        .into());
    };

    let full_returns = aggregate::portfolio_daily_returns(&axis, &series);
    let portfolio = stats::compute(&full_returns[1..]);

    // The comparison is meaningless without the benchmark side, so unlike
    // the chart overlay this failure propagates.
    let closes = state.benchmark.daily_closes(first, last).await?;
    let close_values: Vec<f64> = closes.values().copied().collect();
    let benchmark = stats::compute(&deviation::daily_returns(&close_values));

    let metrics = vec![
        row("Total %", &benchmark, &portfolio, |s| pct(s.total_return)),
        row("CAGR %", &benchmark, &portfolio, |s| pct(s.cagr)),
        row("Win %", &benchmark, &portfolio, |s| pct(s.win_rate)),
        row("Avg. Win %", &benchmark, &portfolio, |s| pct(s.avg_win)),
        row("Avg. Loss %", &benchmark, &portfolio, |s| pct(s.avg_loss)),
        row("Average %", &benchmark, &portfolio, |s| pct(s.avg_daily)),
        row("Largest Win", &benchmark, &portfolio, |s| pct(s.largest_win)),
        row("Largest Loss", &benchmark, &portfolio, |s| {
            pct(s.largest_loss)
        }),
        row("Current DD", &benchmark, &portfolio, |s| pct(s.current_dd)),
        row("Max DD", &benchmark, &portfolio, |s| pct(s.max_drawdown)),
        row("Ann. Std %", &benchmark, &portfolio, |s| pct(s.ann_std)),
        row("Sharpe Ratio", &benchmark, &portfolio, |s| ratio(s.sharpe)),
        row("Sortino Ratio", &benchmark, &portfolio, |s| ratio(s.sortino)),
        row("Reward/Risk", &benchmark, &portfolio, |s| {
            ratio(s.reward_risk)
        }),
    ];

    Ok(ComparisonResponse { metrics })
}

/// The current snapshot of every strategy in the account, as a typed list.
pub async fn strategies(
    state: &AppState,
    creds: &Credentials,
    account: &str,
) -> Result<Vec<StrategySnapshot>, AppError> {
    Ok(state.provider.list_strategies(creds, account).await?)
}

/// Holdings aggregated across every strategy in the account, weighted by
/// market value.
pub async fn allocation(
    state: &AppState,
    creds: &Credentials,
    account: &str,
) -> Result<AllocationResponse, AppError> {
    let snapshots = state.provider.list_strategies(creds, account).await?;

    let mut aggregated: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut total_value = 0.0;
    for snapshot in &snapshots {
        for holding in &snapshot.holdings {
            if holding.value <= 0.0 {
                continue;
            }
            let entry = aggregated.entry(holding.ticker.clone()).or_insert((0.0, 0.0));
            entry.0 += holding.value;
            entry.1 += holding.amount;
            total_value += holding.value;
        }
    }

    let mut items: Vec<AllocationItem> = aggregated
        .into_iter()
        .map(|(symbol, (market_value, quantity))| AllocationItem {
            symbol,
            quantity,
            market_value,
            weight: if total_value > 0.0 {
                market_value / total_value
            } else {
                0.0
            },
        })
        .collect();
    items.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    Ok(AllocationResponse { items, total_value })
}

// ==============================================================================
// Deviation Pipeline
// ==============================================================================

/// Compares one strategy's live performance against its backtest over the
/// same period.
pub async fn live_vs_backtest(
    state: &AppState,
    creds: &Credentials,
    account: &str,
    strategy_id: &str,
) -> Result<DeviationReport, AppError> {
    let live = state
        .provider
        .daily_performance(creds, account, strategy_id)
        .await
        .map_err(|e| match e {
            ApiError::InvalidData(m) => AppError::NoData(m),
            other => AppError::Upstream(other),
        })?;
    let (Some(start), Some(end)) = (live.first_date(), live.last_date()) else {
        return Err(AppError::NoData(
            "insufficient live performance data".to_string(),
        ));
    };

    // Start the simulation with the same capital the live run started with,
    // so the two value series live on the same scale.
    let capital = live
        .deposit_adjusted()
        .first()
        .copied()
        .filter(|v| *v > 0.0)
        .unwrap_or(index::BASE_INDEX);
    let backtest = state
        .provider
        .run_backtest(creds, strategy_id, start, end, capital)
        .await?;

    let metrics = deviation::compute(
        live.dates(),
        live.deposit_adjusted(),
        &backtest.dates,
        &backtest.values,
    );
    let (risk_level, risk_description) = deviation::risk_level(metrics.risk_score);

    let pair = align::intersection_align(
        live.dates(),
        live.deposit_adjusted(),
        &backtest.dates,
        &backtest.values,
    );
    let comparison_data = pair
        .dates
        .iter()
        .zip(pair.left.iter().zip(pair.right.iter()))
        .map(|(date, (l, b))| ComparisonRow {
            date: *date,
            live: round2(*l),
            backtest: round2(*b),
            deviation_pct: if *b > 0.0 {
                round2((l - b) / b * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    let summary = DeviationSummary {
        live_cumulative_return: round2(total_return_pct(live.deposit_adjusted())),
        backtest_cumulative_return: round2(total_return_pct(&backtest.values)),
        tracking_error_annualized_pct: round2(metrics.tracking_error * 100.0),
        correlation: round3(metrics.correlation),
    };

    Ok(DeviationReport {
        strategy_id: strategy_id.to_string(),
        period: Period {
            start,
            end,
            days: pair.dates.len(),
        },
        deviation_metrics: DeviationBlock {
            metrics,
            risk_level,
            risk_description,
        },
        summary,
        comparison_data,
    })
}

/// The same live-vs-backtest comparison for every strategy in the account,
/// highest risk first, with a value-weighted portfolio summary.
pub async fn portfolio_live_vs_backtest(
    state: &AppState,
    creds: &Credentials,
    account: &str,
) -> Result<PortfolioDriftResponse, AppError> {
    let snapshots = state.provider.list_strategies(creds, account).await?;
    if snapshots.is_empty() {
        return Err(AppError::NoData("no strategies in account".to_string()));
    }

    // Backtest simulations are the provider's most expensive call.
    let semaphore = Arc::new(Semaphore::new(state.limits.backtest_calls));
    let tasks = snapshots.iter().map(|snapshot| {
        let semaphore = semaphore.clone();
        let provider = state.provider.clone();
        async move {
            let _permit = semaphore.acquire().await.ok()?;
            drift_for_strategy(provider.as_ref(), creds, account, snapshot).await
        }
    });
    let mut strategies: Vec<StrategyDrift> =
        join_all(tasks).await.into_iter().flatten().collect();
    strategies.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    let portfolio_summary = if strategies.is_empty() {
        PortfolioDriftSummary {
            total_strategies: 0,
            total_portfolio_value: 0.0,
            weighted_avg_risk_score: 0.0,
            risk_level_counts: RiskLevelCounts {
                low: 0,
                moderate: 0,
                elevated: 0,
                high: 0,
            },
            avg_tracking_error_pct: 0.0,
            avg_correlation: 0.0,
        }
    } else {
        let n = strategies.len() as f64;
        let total_value: f64 = strategies.iter().map(|s| s.current_value).sum();
        let weighted_risk = if total_value > 0.0 {
            strategies
                .iter()
                .map(|s| s.risk_score * s.current_value / total_value)
                .sum()
        } else {
            0.0
        };
        PortfolioDriftSummary {
            total_strategies: strategies.len(),
            total_portfolio_value: total_value,
            weighted_avg_risk_score: round2(weighted_risk),
            risk_level_counts: RiskLevelCounts {
                low: count_level(&strategies, "Low"),
                moderate: count_level(&strategies, "Moderate"),
                elevated: count_level(&strategies, "Elevated"),
                high: count_level(&strategies, "High"),
            },
            avg_tracking_error_pct: round2(
                strategies
                    .iter()
                    .map(|s| s.tracking_error_annualized_pct)
                    .sum::<f64>()
                    / n,
            ),
            avg_correlation: round3(
                strategies.iter().map(|s| s.correlation).sum::<f64>() / n,
            ),
        }
    };

    Ok(PortfolioDriftResponse {
        portfolio_summary,
        strategies,
    })
}

/// One strategy's drift row; any failure along the way excludes the strategy
/// rather than failing the portfolio view.
async fn drift_for_strategy(
    provider: &dyn api_client::ProviderClient,
    creds: &Credentials,
    account: &str,
    snapshot: &StrategySnapshot,
) -> Option<StrategyDrift> {
    let live = match provider
        .daily_performance(creds, account, &snapshot.id)
        .await
    {
        Ok(live) => live,
        Err(e) => {
            tracing::warn!(strategy = %snapshot.id, error = %e, "excluding strategy from drift view: performance fetch failed");
            return None;
        }
    };
    if live.len() < 2 {
        return None;
    }
    let (start, end) = (live.first_date()?, live.last_date()?);
    let capital = live
        .deposit_adjusted()
        .first()
        .copied()
        .filter(|v| *v > 0.0)
        .unwrap_or(index::BASE_INDEX);

    let backtest = match provider
        .run_backtest(creds, &snapshot.id, start, end, capital)
        .await
    {
        Ok(backtest) => backtest,
        Err(e) => {
            tracing::warn!(strategy = %snapshot.id, error = %e, "excluding strategy from drift view: backtest failed");
            return None;
        }
    };

    let metrics = deviation::compute(
        live.dates(),
        live.deposit_adjusted(),
        &backtest.dates,
        &backtest.values,
    );
    let (risk_level, _) = deviation::risk_level(metrics.risk_score);
    let live_return = total_return_pct(live.deposit_adjusted());
    let backtest_return = total_return_pct(&backtest.values);

    Some(StrategyDrift {
        strategy_id: snapshot.id.clone(),
        strategy_name: snapshot.name.clone(),
        risk_score: round2(metrics.risk_score),
        risk_level,
        tracking_error_annualized_pct: round2(metrics.tracking_error * 100.0),
        correlation: round3(metrics.correlation),
        mean_deviation_pct: round2(metrics.mean_deviation * 100.0),
        max_deviation_pct: round2(metrics.max_deviation * 100.0),
        live_return_pct: round2(live_return),
        backtest_return_pct: round2(backtest_return),
        return_difference_pct: round2(live_return - backtest_return),
        period_days: metrics.num_data_points,
        current_value: snapshot.market_value.unwrap_or(0.0),
    })
}

// ==============================================================================
// Helpers
// ==============================================================================

/// Fetches every strategy's daily series under the bounded concurrency
/// limit. Individual failures are logged and excluded; partial data is the
/// expected norm across many independent strategies.
async fn fetch_all_series(
    state: &AppState,
    creds: &Credentials,
    account: &str,
    snapshots: &[StrategySnapshot],
) -> Vec<DailySeries> {
    let semaphore = Arc::new(Semaphore::new(state.limits.performance_fetches));
    let tasks = snapshots.iter().map(|snapshot| {
        let semaphore = semaphore.clone();
        let provider = state.provider.clone();
        async move {
            let _permit = semaphore.acquire().await.ok()?;
            match provider
                .daily_performance(creds, account, &snapshot.id)
                .await
            {
                Ok(series) => Some(series),
                Err(e) => {
                    tracing::warn!(strategy = %snapshot.id, error = %e, "excluding strategy: performance fetch failed");
                    None
                }
            }
        }
    });
    join_all(tasks).await.into_iter().flatten().collect()
}

/// Benchmark closes over the axis span. A failed fetch degrades to an empty
/// map (flat overlay) instead of failing the whole request.
async fn fetch_benchmark_closes(
    state: &AppState,
    axis: &[NaiveDate],
) -> BTreeMap<NaiveDate, f64> {
    let (Some(&first), Some(&last)) = (axis.first(), axis.last()) else {
        return BTreeMap::new();
    };
    match state.benchmark.daily_closes(first, last).await {
        Ok(closes) => closes,
        Err(e) => {
            tracing::warn!(error = %e, "benchmark fetch failed; overlay will be flat");
            BTreeMap::new()
        }
    }
}

fn lookback_set(axis: &[NaiveDate], values: &[f64], today: f64) -> LookbackReturns {
    LookbackReturns {
        today,
        seven_days: lookback_return(axis, values, 7),
        thirty_days: lookback_return(axis, values, 30),
        ninety_days: lookback_return(axis, values, 90),
        one_year: lookback_return(axis, values, 365),
        total: match values.first() {
            Some(&first) if first > 0.0 => values[values.len() - 1] / first - 1.0,
            _ => 0.0,
        },
    }
}

fn count_level(strategies: &[StrategyDrift], level: &str) -> usize {
    strategies.iter().filter(|s| s.risk_level == level).count()
}

/// Return over the last completed transition of a value series.
fn latest_return(values: &[f64]) -> f64 {
    if values.len() >= 2 && values[values.len() - 2] > 0.0 {
        values[values.len() - 1] / values[values.len() - 2] - 1.0
    } else {
        0.0
    }
}

fn total_return_pct(values: &[f64]) -> f64 {
    match values.first() {
        Some(&first) if first > 0.0 && values.len() >= 2 => {
            (values[values.len() - 1] / first - 1.0) * 100.0
        }
        _ => 0.0,
    }
}

fn row(
    metric: &'static str,
    benchmark: &stats::RiskStats,
    portfolio: &stats::RiskStats,
    fmt: impl Fn(&stats::RiskStats) -> String,
) -> MetricRow {
    MetricRow {
        metric,
        benchmark: fmt(benchmark),
        portfolio: fmt(portfolio),
    }
}

fn pct(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

fn ratio(x: f64) -> String {
    format!("{x:.2}")
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
