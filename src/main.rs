//! svcauth application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build shared state (verifiers + replay cache)
//! 3. Start the replay cache sweeper
//! 4. Build router with CORS and security headers
//! 5. Start Axum server
//!
//! Also supports a `sign` subcommand that prints the headers for a signed request.

use std::time::Duration;
use svcauth::{
    auth::{AppState, SignedHeaders, SystemTimeSource, TimeSource},
    cleanup,
    config::{Config, BEARER_TOKEN_VAR, DEFAULT_SERVICE_SECRET_ENV},
    routes,
};

/// Sign a request with the secret named by `SERVICE_SECRET_ENV`.
fn sign(
    service_id: &str,
    method: &str,
    path: &str,
    body_file: Option<&str>,
) -> Result<SignedHeaders, String> {
    let _ = dotenvy::dotenv();

    let secret_env = std::env::var("SERVICE_SECRET_ENV")
        .unwrap_or_else(|_| DEFAULT_SERVICE_SECRET_ENV.to_string());
    let secret = std::env::var(&secret_env)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{} is not set", secret_env))?;

    let body = match body_file {
        Some(file) => std::fs::read(file).map_err(|e| format!("Reading {}: {}", file, e))?,
        None => Vec::new(),
    };

    Ok(SignedHeaders::new(
        service_id,
        secret.as_bytes(),
        &method.to_ascii_uppercase(),
        path,
        &body,
        SystemTimeSource.now(),
    ))
}

fn print_sign_usage() {
    eprintln!("Usage: svcauth sign <service-id> <METHOD> <path> [body-file]");
    eprintln!();
    eprintln!("Print X-Service-Id, X-Timestamp and X-Signature headers for a request,");
    eprintln!("signed with the secret held in the variable named by SERVICE_SECRET_ENV");
    eprintln!("(default {}).", DEFAULT_SERVICE_SECRET_ENV);
    eprintln!();
    eprintln!("Example:");
    eprintln!("  svcauth sign svc-a POST /verify payload.json");
}

#[tokio::main]
async fn main() {
    // Check for sign subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "sign" {
        if args.len() != 5 && args.len() != 6 {
            print_sign_usage();
            std::process::exit(1);
        }

        match sign(&args[2], &args[3], &args[4], args.get(5).map(String::as_str)) {
            Ok(headers) => {
                for (name, value) in headers.pairs() {
                    println!("{}: {}", name, value);
                }
            }
            Err(e) => {
                eprintln!("Error signing request: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting svcauth on {}", config.bind_addr);

    // Secrets are allowed to be missing; the affected surface answers 500
    if config.bearer_token.is_none() {
        tracing::error!("{} is not set; orchestrator routes will fail", BEARER_TOKEN_VAR);
    }
    if config.service_secret.is_none() {
        tracing::error!(
            "{} is not set; service routes will fail",
            config.service_secret_env
        );
    }

    let bind_addr = config.bind_addr;
    let sweep_interval = Duration::from_secs(config.replay_sweep_interval_secs);

    // Build shared state
    let state = AppState::new(config);

    // Periodic purge of expired replay entries
    let _sweeper = cleanup::spawn_sweeper(state.replay_cache.clone(), sweep_interval);

    let app = routes::app(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
