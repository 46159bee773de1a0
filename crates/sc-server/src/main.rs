//! sc-server: Smart Chat Service Main Binary
//!
//! Usage:
//!   sc-server            - Start the HTTP API server
//!   sc-server --help     - Show help
//!   sc-server --version  - Show version

use std::sync::Arc;

use sc_core::{ChatService, Config, ConversationStore, ModelClient};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// HTTP API server
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("sc-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration (smartchat.toml if present, env otherwise)
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting sc-server...");
    tracing::info!("Model: {}", config.llm.model);

    let store = ConversationStore::new(&config.storage.db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open conversation store: {}", e))?;
    tracing::info!("Conversation store ready at {}", config.storage.db_path);

    let model = ModelClient::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create model client: {}", e))?;

    let service = Arc::new(ChatService::new(store, Arc::new(model)));

    // Start HTTP API server
    let api_port = config.api.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = sc_api::start_server(api_port, service).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    tracing::info!("HTTP API server started on port {}", api_port);
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("sc-server - Smart Chat Service");
    println!();
    println!("Usage:");
    println!("  sc-server            Start the HTTP API server");
    println!("  sc-server --help     Show this help message");
    println!("  sc-server --version  Show version");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY          API key (required; OPENAI_API_KEY also accepted)");
    println!("  LLM_MODEL            Model name (default: gpt-3.5-turbo)");
    println!("  LLM_PROVIDER         Provider: openai or claude (default: openai)");
    println!("  LLM_BASE_URL         Custom API endpoint");
    println!("  LLM_TEMPERATURE      Sampling temperature (default: 0.7)");
    println!("  LLM_TIMEOUT_SECS     Provider request timeout (default: 60)");
    println!("  API_PORT             HTTP API port (default: 8000)");
    println!("  DB_PATH              SQLite database path (default: data/smartchat.db)");
}
