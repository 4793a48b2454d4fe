//! # OTP Gate - One-Time Passcode Service
//!
//! Issues short-lived 6-digit codes bound to a phone number or email and
//! verifies them exactly once, with per-identifier throttling.
//!
//! ## Architecture
//! ```text
//! Client → OTP Gate (axum) → Rate Limiter → Issuer / Verifier
//!                                 ↓
//!                        Key-value store (Redis)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod otp;
mod ratelimit;
mod routes;
mod state;
mod store;

use config::AppConfig;
use state::AppState;

/// OTP Gate - one-time passcode service
#[derive(Parser, Debug)]
#[command(name = "otp-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/otp-gate.toml")]
    config: String,

    /// Store URL, `redis://...` or `memory://` (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Listen port (overrides the port of the listen address)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Comma-separated CORS origins, `*` for any (overrides config)
    #[arg(long, env = "ALLOWED_ORIGINS")]
    allowed_origins: Option<String>,

    /// Echo generated codes in responses; ignored in production
    #[arg(long, env = "DEBUG", value_parser = clap::builder::BoolishValueParser::new())]
    debug: Option<bool>,

    /// Environment marker (development, staging, production)
    #[arg(long, env = "ENV")]
    env: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting OTP Gate v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&args.config, &args)?;
    info!(
        environment = ?config.environment,
        debug = config.debug,
        "Configuration loaded from {}",
        args.config
    );
    if config.debug {
        tracing::warn!("Debug mode enabled: generated codes are returned in responses");
    }

    // Fail fast if the store is unreachable
    let state = AppState::connect(config.clone()).await?;
    info!(backend = state.store.backend(), "Store connected");
    let store = state.store.clone();

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("OTP Gate listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    drop(store);
    info!("Store connection released");
    info!("OTP Gate shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
