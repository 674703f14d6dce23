use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{BenchmarkConfig, FetchLimits, ProviderConfig, ServerConfig, Settings};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, layers `MERIDIAN_`-prefixed environment variables on
/// top (e.g. `MERIDIAN_SERVER__PORT=8080`), and deserializes the result into
/// our strongly-typed `Settings` struct.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml"))
        .add_source(config::Environment::with_prefix("MERIDIAN").separator("__"))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;

    if settings.limits.performance_fetches == 0 || settings.limits.backtest_calls == 0 {
        return Err(ConfigError::ValidationError(
            "fetch concurrency limits must be at least 1".to_string(),
        ));
    }

    Ok(settings)
}
