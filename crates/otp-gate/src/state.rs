//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::otp::{Dispatcher, LogDispatcher, OtpIssuer, OtpVerifier};
use crate::ratelimit::RateLimiter;
use crate::store::{self, KeyValueStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Key-value store handle, created once at startup
    pub store: Arc<dyn KeyValueStore>,

    /// OTP issuer (includes the issuance throttle)
    pub issuer: Arc<OtpIssuer>,

    /// OTP verifier (includes the attempt throttle)
    pub verifier: Arc<OtpVerifier>,
}

impl AppState {
    /// Connect to the configured store and wire up services.
    ///
    /// Fails if the store cannot be reached.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let store = store::connect(&config.redis_url, &config.store)
            .await
            .context("Failed to connect to key-value store")?;

        Ok(Self::new(config, store, Arc::new(LogDispatcher)))
    }

    /// Wire services around an existing store handle
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let attempts = Arc::new(RateLimiter::verification(
            store.clone(),
            config.rate_limit.verify_max_attempts,
        ));
        let issuer = Arc::new(OtpIssuer::new(store.clone(), attempts.clone(), dispatcher));
        let verifier = Arc::new(OtpVerifier::new(store.clone(), attempts));

        Self {
            config,
            store,
            issuer,
            verifier,
        }
    }

    /// True if the store answers a ping within `store.health_timeout_secs`
    pub async fn store_healthy(&self) -> bool {
        let budget = Duration::from_secs(self.config.store.health_timeout_secs);
        match tokio::time::timeout(budget, self.store.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, backend = self.store.backend(), "Store health check failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    backend = self.store.backend(),
                    timeout_secs = budget.as_secs(),
                    "Store health check timed out"
                );
                false
            }
        }
    }
}
