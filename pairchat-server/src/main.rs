//! `PairChat` server -- presence-aware direct-message routing.
//!
//! A WebSocket server that admits authenticated users, announces their
//! connection status to friends, and routes direct messages to live
//! sessions with a durable store-for-later fallback.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9000
//! cargo run --bin pairchat-server
//!
//! # Run on custom address with a seeded roster
//! cargo run --bin pairchat-server -- --bind 127.0.0.1:8080 --roster roster.toml
//!
//! # Or via environment variables
//! PAIRCHAT_ADDR=127.0.0.1:8080 PAIRCHAT_JWT_SECRET=... cargo run --bin pairchat-server
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pairchat_server::config::{DEV_JWT_SECRET, ServerCliArgs, ServerConfig};
use pairchat_server::directory::InMemoryDirectory;
use pairchat_server::server::{self, AppState};
use pairchat_server::store::InMemoryStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.jwt_secret == DEV_JWT_SECRET {
        tracing::warn!("using built-in development JWT secret; set PAIRCHAT_JWT_SECRET");
    }

    let directory = match &config.roster {
        Some(path) => match InMemoryDirectory::from_roster_file(path) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "failed to load roster");
                std::process::exit(1);
            }
        },
        None => InMemoryDirectory::new(),
    };

    tracing::info!(addr = %config.bind_addr, "starting pairchat server");

    let state = Arc::new(AppState::new(
        directory,
        InMemoryStore::new(),
        config.jwt_secret.clone().into_bytes(),
        Duration::from_secs(config.auth_timeout_secs),
    ));

    match server::start_server(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
