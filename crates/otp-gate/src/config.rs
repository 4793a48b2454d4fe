//! Configuration management for the OTP gate.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use otp_common::constants::{DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, VERIFY_MAX_ATTEMPTS};

/// Deployment environment marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse the `ENV` marker; anything unrecognised is treated as development
    pub fn from_marker(marker: &str) -> Self {
        match marker.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Store connection URL (`redis://...` or `memory://`)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Origins allowed for cross-origin requests (`*` for any)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Echo generated codes in issuance responses
    #[serde(default)]
    pub debug: bool,

    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Store client configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Throttling configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Store client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-command response timeout in seconds; below `request_timeout_secs`
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    /// Budget for the `/health` ping; below `request_timeout_secs`
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// Expired-entry sweep interval for the memory backend
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            health_timeout_secs: default_health_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Throttling configuration.
///
/// Issuance limits are fixed policy (see `otp_common::constants`); only the
/// verification attempt cap is tunable.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Verification attempts allowed per identifier per code lifetime (0 disables)
    #[serde(default = "default_verify_max_attempts")]
    pub verify_max_attempts: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            verify_max_attempts: default_verify_max_attempts(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_allowed_origins() -> Vec<String> { vec!["*".to_string()] }
fn default_request_timeout() -> u64 { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_response_timeout() -> u64 { 5 }
fn default_health_timeout() -> u64 { 3 }
fn default_sweep_interval() -> u64 { 60 }
fn default_verify_max_attempts() -> u64 { VERIFY_MAX_ATTEMPTS }

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace the port of a `host:port` address
fn with_port(addr: &str, port: u16) -> String {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    format!("{host}:{port}")
}

impl AppConfig {
    /// Load configuration from file, with CLI/env overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(port) = args.port {
            config.listen_addr = with_port(&config.listen_addr, port);
        }
        if let Some(ref origins) = args.allowed_origins {
            config.allowed_origins = parse_origins(origins);
        }
        if let Some(debug) = args.debug {
            config.debug = debug;
        }
        if let Some(ref env) = args.env {
            config.environment = Environment::from_marker(env);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject unusable settings and enforce production safety
    pub fn validate(&mut self) -> Result<()> {
        if self.allowed_origins.is_empty() {
            bail!("allowed_origins must name at least one origin (use \"*\" for any)");
        }
        if self.request_timeout_secs == 0
            || self.store.connect_timeout_secs == 0
            || self.store.response_timeout_secs == 0
            || self.store.health_timeout_secs == 0
        {
            bail!("timeouts must be at least one second");
        }
        // Store calls must give up before the request timeout answers for them
        if self.store.response_timeout_secs >= self.request_timeout_secs {
            bail!("store.response_timeout_secs must be less than request_timeout_secs");
        }
        if self.store.health_timeout_secs >= self.request_timeout_secs {
            bail!("store.health_timeout_secs must be less than request_timeout_secs");
        }
        if self.store.sweep_interval_secs == 0 {
            bail!("store.sweep_interval_secs must be at least one second");
        }
        if self.debug && self.environment.is_production() {
            tracing::warn!("Debug mode requested in production; generated codes stay hidden");
            self.debug = false;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            allowed_origins: default_allowed_origins(),
            debug: false,
            environment: Environment::default(),
            request_timeout_secs: default_request_timeout(),
            store: StoreConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
