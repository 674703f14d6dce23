use crate::error::AppError;
use crate::extract::credentials_from_headers;
use crate::pipeline;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::NaiveDate;
use core_types::Credentials;
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters shared by the account-scoped endpoints. The account is
/// optional; when absent the caller's default account is resolved upstream.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub account: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Pulls the caller's credentials out of the headers or fails with a 401
/// before anything touches the provider.
fn require_credentials(headers: &HeaderMap) -> Result<Credentials, AppError> {
    credentials_from_headers(headers).ok_or_else(|| {
        AppError::Unauthorized(
            "provide an Authorization header or the x-api-key-id/x-api-secret pair".to_string(),
        )
    })
}

async fn resolve_account(
    state: &AppState,
    creds: &Credentials,
    requested: Option<String>,
) -> Result<String, AppError> {
    match requested {
        Some(account) => Ok(account),
        None => Ok(state.provider.default_account(creds).await?),
    }
}

/// Handler for `GET /api/performance`.
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::PerformanceResponse>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling portfolio performance request.");
    let response =
        pipeline::portfolio_performance(&state, &creds, &account, query.start, query.end).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/portfolio-risk`.
pub async fn get_portfolio_risk(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::RiskResponse>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling portfolio risk request.");
    let response = pipeline::portfolio_risk(&state, &creds, &account).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/risk-comparison`.
pub async fn get_risk_comparison(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::ComparisonResponse>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling risk comparison request.");
    let response = pipeline::risk_comparison(&state, &creds, &account).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/strategies`.
pub async fn get_strategies(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<core_types::StrategySnapshot>>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling strategy list request.");
    let response = pipeline::strategies(&state, &creds, &account).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/allocation`.
pub async fn get_allocation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::AllocationResponse>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling allocation request.");
    let response = pipeline::allocation(&state, &creds, &account).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/strategy/:id/live-vs-backtest`.
pub async fn get_live_vs_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(strategy_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::DeviationReport>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, strategy = %strategy_id, "Handling live-vs-backtest request.");
    let response = pipeline::live_vs_backtest(&state, &creds, &account, &strategy_id).await?;
    Ok(Json(response))
}

/// Handler for `GET /api/portfolio/live-vs-backtest`.
pub async fn get_portfolio_live_vs_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<pipeline::PortfolioDriftResponse>, AppError> {
    let creds = require_credentials(&headers)?;
    let account = resolve_account(&state, &creds, query.account).await?;
    tracing::info!(%account, "Handling portfolio live-vs-backtest request.");
    let response = pipeline::portfolio_live_vs_backtest(&state, &creds, &account).await?;
    Ok(Json(response))
}
