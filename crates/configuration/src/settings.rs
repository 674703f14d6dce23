use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub limits: FetchLimits,
}

/// Bind parameters for the web server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connection parameters for the trading-data provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider REST API, without a trailing slash.
    pub base_url: String,
}

/// Connection parameters for the market benchmark source.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkConfig {
    /// Base URL of the daily-chart endpoint, without a trailing slash.
    pub base_url: String,
    /// The benchmark ticker whose closes are overlaid on the portfolio,
    /// e.g. "SPY".
    pub symbol: String,
}

/// Bounded concurrency for the upstream fan-outs, so one request does not
/// hammer the provider's rate limits.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchLimits {
    /// Simultaneous per-strategy daily-performance fetches.
    pub performance_fetches: usize,
    /// Simultaneous backtest-simulation calls.
    pub backtest_calls: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            performance_fetches: 8,
            backtest_calls: 3,
        }
    }
}
