//! Fixed-window counter backed by the key-value store.

use otp_common::constants::{
    ISSUE_MAX_REQUESTS, ISSUE_WINDOW_SECS, VERIFY_WINDOW_SECS, store_keys,
};
use otp_common::{Identifier, OtpError};
use std::sync::Arc;
use std::time::Duration;

use crate::store::KeyValueStore;

/// Fixed-window request counter per identifier
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    /// Key prefix, e.g. `rate_limit:otp:`
    prefix: &'static str,
    /// Requests admitted per window
    max_requests: u64,
    /// Window length, applied as the counter TTL on creation
    window: Duration,
    /// Message returned when a request is rejected
    rejection: &'static str,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        prefix: &'static str,
        max_requests: u64,
        window: Duration,
        rejection: &'static str,
    ) -> Self {
        Self {
            store,
            prefix,
            max_requests,
            window,
            rejection,
        }
    }

    /// Issuance policy: 5 requests per identifier per 10 minutes
    pub fn issuance(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(
            store,
            store_keys::ISSUE_RATE_PREFIX,
            ISSUE_MAX_REQUESTS,
            Duration::from_secs(ISSUE_WINDOW_SECS),
            "Too many OTP requests. Try again later.",
        )
    }

    /// Verification policy: `max_attempts` guesses per identifier per code
    /// lifetime. Zero disables the cap.
    pub fn verification(store: Arc<dyn KeyValueStore>, max_attempts: u64) -> Self {
        Self::new(
            store,
            store_keys::VERIFY_RATE_PREFIX,
            max_attempts,
            Duration::from_secs(VERIFY_WINDOW_SECS),
            "Too many verification attempts. Request a new code later.",
        )
    }

    pub fn key(&self, identifier: &Identifier) -> String {
        format!("{}{}", self.prefix, identifier.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    /// Admit or reject one request for `identifier`.
    ///
    /// Returns the request's position in the current window. A rejected
    /// request does not move the counter.
    pub async fn check(&self, identifier: &Identifier) -> Result<u64, OtpError> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let key = self.key(identifier);
        match self
            .store
            .increment_bounded(&key, self.max_requests, self.window)
            .await?
        {
            Some(count) => {
                tracing::debug!(
                    identifier = %identifier,
                    count,
                    limit = self.max_requests,
                    prefix = self.prefix,
                    "Request admitted"
                );
                Ok(count)
            }
            None => {
                tracing::warn!(
                    identifier = %identifier,
                    limit = self.max_requests,
                    window_secs = self.window.as_secs(),
                    prefix = self.prefix,
                    "Rate limit exceeded"
                );
                Err(OtpError::TooManyRequests(self.rejection.to_string()))
            }
        }
    }

    /// Clear the counter for `identifier`
    pub async fn reset(&self, identifier: &Identifier) -> Result<(), OtpError> {
        if self.is_enabled() {
            self.store.delete(&self.key(identifier)).await?;
        }
        Ok(())
    }
}
