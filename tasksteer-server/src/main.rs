//! `TaskSteer` server -- transcripts in, tasks out.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! GEMINI_API_KEY=... FIREBASE_API_KEY=... cargo run --bin tasksteer-server
//!
//! # Custom address, persistent store and a log file
//! cargo run --bin tasksteer-server -- --bind 127.0.0.1:9090 \
//!     --data-file tasksteer.json --log-file /tmp/tasksteer.log
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tasksteer_server::ai::TaskModel;
use tasksteer_server::auth::{IdentityToolkitVerifier, StaticTokenVerifier, TokenVerifier};
use tasksteer_server::config::{CliArgs, ServerConfig};
use tasksteer_server::gemini::GeminiClient;
use tasksteer_server::server::{self, AppState};
use tasksteer_server::store::{MemoryStore, TaskStore};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, config.log_file.as_deref());

    tracing::info!(addr = %config.bind_addr, "starting tasksteer server");

    let state = match build_state(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize server state");
            std::process::exit(1);
        }
    };

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "tasksteer server listening");
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

/// Logs to stdout, or to `file_path` when one is configured.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return None;
    };

    let Some((log_dir, file_name)) = split_log_path(log_path) else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        tracing::warn!(
            path = %log_path.display(),
            "log file path has no usable file name, logging to stdout"
        );
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Directory and file name of a log file path. `None` when the path has
/// no UTF-8 file name, such as `/` or a path ending in `..`.
fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    let file_name = path.file_name()?.to_str()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Some((dir, file_name))
}

fn build_state(config: &ServerConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let store: Arc<dyn TaskStore> = match &config.data_file {
        Some(path) => Arc::new(MemoryStore::open(path)?),
        None => {
            tracing::warn!("no data file configured, tasks are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match &config.auth.firebase_api_key {
        Some(key) => Arc::new(IdentityToolkitVerifier::new(
            &config.auth.identity_base_url,
            key,
        )?),
        None => {
            let verifier = StaticTokenVerifier::from_config(&config.auth.tokens);
            tracing::warn!(
                tokens = verifier.len(),
                "no identity provider key, using static tokens from config"
            );
            Arc::new(verifier)
        }
    };

    let mut state = AppState::new(store, verifier)
        .with_cors_origins(config.cors_origins.clone())
        .with_max_upload_size(config.max_upload_size);

    match GeminiClient::from_config(&config.ai)? {
        Some(client) => {
            tracing::info!(model = %config.ai.model, "generative model configured");
            let model: Arc<dyn TaskModel> = Arc::new(client);
            state = state.with_model(model);
        }
        None => tracing::warn!("no model API key, /upload and /suggest-status will return 503"),
    }

    Ok(state)
}
