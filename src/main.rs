use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use docspeak::{PipelineConfig, handlers::S3Event, routes, state::AppState};

/// docspeak - Document-to-speech pipeline over S3 and Amazon Polly
#[derive(Parser, Debug)]
#[command(name = "docspeak")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (URL signer and ingest webhook)
    Serve,

    /// Process one S3 notification document and print the report as JSON
    Ingest {
        /// Path to the notification JSON
        #[arg(short = 'e', long = "event", value_name = "FILE")]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing, honoring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = &cli.config {
        println!("Loading configuration from {}", config_path.display());
        PipelineConfig::from_file(config_path)?
    } else {
        PipelineConfig::from_env()?
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ingest { event } => ingest_once(config, &event).await,
    }
}

async fn serve(config: PipelineConfig) -> anyhow::Result<()> {
    let address = config.address();
    println!("Starting server on {address}");

    let app_state = AppState::new(config).await?;

    let app = routes::api::create_app(app_state).layer(SetResponseHeaderLayer::overriding(
        http::header::X_CONTENT_TYPE_OPTIONS,
        http::HeaderValue::from_static("nosniff"),
    ));

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    println!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ingest_once(config: PipelineConfig, event_path: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(event_path)
        .await
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let event: S3Event = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse S3 event in {}", event_path.display()))?;

    let app_state = AppState::new(config).await?;
    let report = app_state.ingest.handle(&event).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
