use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use configuration::BenchmarkConfig;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The abstract source of benchmark daily closing prices.
#[async_trait]
pub trait BenchmarkSource: Send + Sync {
    /// Daily closes keyed by date over `[start, end]`, end inclusive.
    async fn daily_closes(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, ApiError>;
}

/// Fetches benchmark closes from a Yahoo-style daily chart endpoint.
#[derive(Clone)]
pub struct ChartBenchmarkClient {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
}

impl ChartBenchmarkClient {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            symbol: config.symbol.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartPayload,
}

#[derive(Deserialize)]
struct ChartPayload {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[async_trait]
impl BenchmarkSource for ChartBenchmarkClient {
    async fn daily_closes(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, ApiError> {
        // The chart endpoint treats period2 as exclusive; pad one day so the
        // requested end date is included.
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or_default();

        let url = format!("{}/v8/finance/chart/{}", self.base_url, self.symbol);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Provider(format!(
                "benchmark chart request failed with {status}: {text}"
            )));
        }

        let payload = response
            .json::<ChartResponse>()
            .await
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;

        let Some(result) = payload.chart.result.into_iter().next() else {
            return Err(ApiError::InvalidData(
                "benchmark chart response carried no result".to_string(),
            ));
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Err(ApiError::InvalidData(
                "benchmark chart response carried no quote block".to_string(),
            ));
        };

        let mut closes = BTreeMap::new();
        for (ts, close) in result.timestamp.iter().zip(quote.close.iter()) {
            let Some(close) = close else { continue };
            if *close <= 0.0 {
                continue;
            }
            if let Some(dt) = DateTime::from_timestamp(*ts, 0) {
                closes.insert(dt.date_naive(), *close);
            }
        }
        Ok(closes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_payload_parses_and_filters() {
        let payload: ChartResponse = serde_json::from_str(
            r#"{
                "chart": {
                    "result": [{
                        "timestamp": [1704153600, 1704240000, 1704326400],
                        "indicators": {"quote": [{"close": [470.0, null, 472.5]}]}
                    }]
                }
            }"#,
        )
        .unwrap();
        let result = &payload.chart.result[0];
        assert_eq!(result.timestamp.len(), 3);
        assert_eq!(result.indicators.quote[0].close[1], None);
    }
}
