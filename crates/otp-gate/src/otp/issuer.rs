//! OTP issuance.

use chrono::{DateTime, Utc};
use otp_common::constants::{OTP_LENGTH, OTP_SPACE, OTP_TTL_SECS};
use otp_common::{Identifier, OtpError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use super::{Dispatcher, otp_key};
use crate::ratelimit::RateLimiter;
use crate::store::KeyValueStore;

/// Result of a successful issuance
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_in: Duration,
    pub expires_at: DateTime<Utc>,
}

/// OTP issuer service
pub struct OtpIssuer {
    store: Arc<dyn KeyValueStore>,
    /// Issuance throttle, consulted before any code is generated
    limiter: RateLimiter,
    /// Verification attempt counter, cleared for each new code
    attempts: Arc<RateLimiter>,
    dispatcher: Arc<dyn Dispatcher>,
    ttl: Duration,
}

impl OtpIssuer {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        attempts: Arc<RateLimiter>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            limiter: RateLimiter::issuance(store.clone()),
            store,
            attempts,
            dispatcher,
            ttl: Duration::from_secs(OTP_TTL_SECS),
        }
    }

    /// Issue a fresh code for `identifier`, replacing any live one.
    pub async fn issue(&self, identifier: &Identifier) -> Result<IssuedOtp, OtpError> {
        self.limiter.check(identifier).await?;

        let code = generate_code();
        self.store
            .set_ex(&otp_key(identifier), &code, self.ttl)
            .await?;
        self.attempts.reset(identifier).await?;

        self.dispatcher.dispatch(identifier, &code).await?;

        tracing::info!(
            identifier = %identifier,
            expires_in = self.ttl.as_secs(),
            "OTP issued"
        );

        Ok(IssuedOtp {
            code,
            expires_in: self.ttl,
            expires_at: Utc::now() + chrono::Duration::seconds(self.ttl.as_secs() as i64),
        })
    }
}

/// Draw a code uniformly from `000000..=999999`.
///
/// `rand::rng()` is a ChaCha-based CSPRNG seeded from the OS.
pub fn generate_code() -> String {
    let value = rand::rng().random_range(0..OTP_SPACE);
    format!("{value:0width$}", width = OTP_LENGTH)
}
