//! Out-Pass Reference Backend
//!
//! Run with: cargo run --bin outpass-server
//!
//! # Configuration
//!
//! Read from the outpass config file, then environment overrides:
//! - `OUTPASS_SERVER_HOST`: Host to bind to (default: 0.0.0.0)
//! - `OUTPASS_SERVER_PORT`: Port to listen on (default: 8000)
//! - `OUTPASS_LOG_LEVEL`: Log level (default: info)
//! - `OUTPASS_LOG_FORMAT`: Log format, pretty or json (default: pretty)
//! - `RUST_LOG`: Overrides the log filter entirely

use outpass::config::Config;
use outpass::server::{serve, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "outpass={},tower_http=debug",
            config.logging.level
        ))
    });
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting out-pass backend v{}", env!("CARGO_PKG_VERSION"));

    serve(AppState::new(), &config.server).await?;

    tracing::info!("Out-pass backend stopped");
    Ok(())
}
