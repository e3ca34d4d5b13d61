use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pandora_display::{config::DisplayConfig, display::Display, sink::TracingSink, transport::WsTransport};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pandora_display=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match DisplayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting Pandora display for {}...", config.server_url);
    if config.muted {
        tracing::info!("Audio cues muted");
    }

    let sink = Arc::new(TracingSink::new(config.muted));
    let mut transport = WsTransport::spawn(config.server_url.clone(), config.reconnect);
    let mut display = Display::new(sink);

    tokio::select! {
        _ = display.run(&mut transport) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
}
