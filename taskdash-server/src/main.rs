//! `Taskdash` API server -- REST endpoints for tasks and users.
//!
//! # Usage
//!
//! ```bash
//! # In-memory records on the default address 127.0.0.1:3000
//! cargo run --bin taskdash-server
//!
//! # Persist records as JSON files
//! cargo run --bin taskdash-server -- --data-dir ./data --bind 0.0.0.0:3000
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdash_server::api::{self, AppState};
use taskdash_server::config::{ServerCliArgs, ServerConfig};
use taskdash_server::store::RecordStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let records = match &config.data_dir {
        Some(dir) => match RecordStore::open(dir) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "failed to open record store");
                std::process::exit(1);
            }
        },
        None => RecordStore::new(),
    };

    tracing::info!(addr = %config.bind_addr, "starting taskdash api server");

    let state = Arc::new(AppState::with_records(records));

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "api server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "api server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start api server");
            std::process::exit(1);
        }
    }
}
