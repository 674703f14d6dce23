use clap::{Parser, Subcommand};

/// The main entry point for the Meridian analytics service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let mut settings = configuration::load_settings()?;
            if let Some(port) = args.port {
                settings.server.port = port;
            }
            tracing::info!(
                provider = %settings.provider.base_url,
                benchmark = %settings.benchmark.symbol,
                "Starting Meridian server."
            );
            web_server::run_server(settings).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Portfolio performance and drift analytics over a trading-data provider.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analytics web server.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Override the port from config.toml.
    #[arg(long)]
    port: Option<u16>,
}
