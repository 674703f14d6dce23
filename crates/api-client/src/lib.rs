use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::ProviderConfig;
use core_types::{Credentials, DailySeries, StrategySnapshot};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::json;

pub mod auth;
pub mod benchmark;
pub mod error;
pub mod responses;

// --- Public API ---
pub use auth::basic_credentials;
pub use benchmark::{BenchmarkSource, ChartBenchmarkClient};
pub use responses::BacktestSeries;

/// The generic, abstract interface to the trading-data provider.
/// This trait is the contract the pipelines use, allowing the underlying
/// implementation (live or mock) to be swapped out.
///
/// Caller credentials are an explicit parameter on every call; the client
/// holds no ambient authentication state.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Resolves the caller's default account uuid (the provider's first
    /// listed account).
    async fn default_account(&self, creds: &Credentials) -> Result<String, ApiError>;

    /// Fetches the current snapshot of every strategy in the account.
    async fn list_strategies(
        &self,
        creds: &Credentials,
        account: &str,
    ) -> Result<Vec<StrategySnapshot>, ApiError>;

    /// Fetches one strategy's daily performance history, converted to a
    /// strongly-typed series at the boundary.
    async fn daily_performance(
        &self,
        creds: &Credentials,
        account: &str,
        strategy_id: &str,
    ) -> Result<DailySeries, ApiError>;

    /// Runs a backtest simulation for a strategy over a date range, started
    /// from the given capital.
    async fn run_backtest(
        &self,
        creds: &Credentials,
        strategy_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        capital: f64,
    ) -> Result<BacktestSeries, ApiError>;
}

/// A concrete `ProviderClient` speaking the provider's REST API over HTTPS.
#[derive(Clone)]
pub struct HttpProviderClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProviderClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
        }
    }

    fn headers(creds: &Credentials) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&creds.authorization)
            .map_err(|e| ApiError::InvalidData(format!("invalid authorization header: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        if let Some(env) = &creds.environment {
            let value = HeaderValue::from_str(env)
                .map_err(|e| ApiError::InvalidData(format!("invalid environment header: {e}")))?;
            headers.insert("x-provider-environment", value);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        creds: &Credentials,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .headers(Self::headers(creds)?)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            Err(ApiError::Provider(format!(
                "GET {path} failed with {status}: {text}"
            )))
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        creds: &Credentials,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .headers(Self::headers(creds)?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            Err(ApiError::Provider(format!(
                "POST {path} failed with {status}: {text}"
            )))
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn default_account(&self, creds: &Credentials) -> Result<String, ApiError> {
        let accounts: responses::AccountsResponse = self.get_json("/accounts", creds).await?;
        accounts
            .accounts
            .into_iter()
            .next()
            .map(|a| a.account_uuid)
            .ok_or_else(|| ApiError::Provider("no accounts found".to_string()))
    }

    async fn list_strategies(
        &self,
        creds: &Credentials,
        account: &str,
    ) -> Result<Vec<StrategySnapshot>, ApiError> {
        let path = format!("/accounts/{account}/aggregate-stats");
        let response: responses::StrategyListResponse = self.get_json(&path, creds).await?;
        Ok(response.strategies.into_iter().map(Into::into).collect())
    }

    async fn daily_performance(
        &self,
        creds: &Credentials,
        account: &str,
        strategy_id: &str,
    ) -> Result<DailySeries, ApiError> {
        let path = format!("/accounts/{account}/strategies/{strategy_id}/daily-performance");
        let raw: responses::RawDailyPerformance = self.get_json(&path, creds).await?;
        raw.into_daily_series(strategy_id)
    }

    async fn run_backtest(
        &self,
        creds: &Credentials,
        strategy_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        capital: f64,
    ) -> Result<BacktestSeries, ApiError> {
        let path = format!("/strategies/{strategy_id}/backtest");
        let body = json!({
            "start_date": start.to_string(),
            "end_date": end.to_string(),
            "include_daily_values": true,
            "capital": capital,
        });
        let raw: responses::RawBacktest = self.post_json(&path, creds, &body).await?;
        raw.into_series(capital)
    }
}
