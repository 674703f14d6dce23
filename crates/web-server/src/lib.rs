use api_client::{BenchmarkSource, ChartBenchmarkClient, HttpProviderClient, ProviderClient};
use axum::{Router, routing::get};
use configuration::{FetchLimits, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod pipeline;

/// The shared application state that all handlers can access.
///
/// The provider and benchmark sit behind trait objects so the pipelines can
/// be exercised against mocks.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ProviderClient>,
    pub benchmark: Arc<dyn BenchmarkSource>,
    pub limits: FetchLimits,
}

/// The main function to configure and run the web server.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let app_state = Arc::new(AppState {
        provider: Arc::new(HttpProviderClient::new(&settings.provider)),
        benchmark: Arc::new(ChartBenchmarkClient::new(&settings.benchmark)),
        limits: settings.limits.clone(),
    });

    // The dashboard is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    // --- DEFINE THE APPLICATION ROUTES ---
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/performance", get(handlers::get_performance))
        .route("/api/portfolio-risk", get(handlers::get_portfolio_risk))
        .route("/api/risk-comparison", get(handlers::get_risk_comparison))
        .route("/api/strategies", get(handlers::get_strategies))
        .route("/api/allocation", get(handlers::get_allocation))
        .route(
            "/api/strategy/:strategy_id/live-vs-backtest",
            get(handlers::get_live_vs_backtest),
        )
        .route(
            "/api/portfolio/live-vs-backtest",
            get(handlers::get_portfolio_live_vs_backtest),
        )
        .with_state(app_state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    tracing::info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
