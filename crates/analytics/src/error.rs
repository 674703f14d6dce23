use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The aggregated date axis ended up empty, so nothing can be computed.
    /// This is distinct from a series of real zero returns.
    #[error("No performance data available: {0}")]
    NoData(String),
}
