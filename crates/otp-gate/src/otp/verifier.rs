//! OTP verification logic.

use otp_common::{Identifier, OtpError};
use std::sync::Arc;

use super::otp_key;
use crate::ratelimit::RateLimiter;
use crate::store::KeyValueStore;

/// OTP verifier service
pub struct OtpVerifier {
    store: Arc<dyn KeyValueStore>,
    /// Verification attempt throttle (shared with the issuer, which resets it)
    attempts: Arc<RateLimiter>,
}

impl OtpVerifier {
    pub fn new(store: Arc<dyn KeyValueStore>, attempts: Arc<RateLimiter>) -> Self {
        Self { store, attempts }
    }

    /// Check `code` against the live code for `identifier`, consuming it on
    /// a match.
    ///
    /// - no live code (never issued, consumed, or expired): `Expired`
    /// - mismatch: `Invalid`, and the live code is left in place
    /// - match: the record is deleted; only the caller whose delete removed
    ///   it is verified, so a concurrent duplicate gets `Expired`
    pub async fn verify(&self, identifier: &Identifier, code: &str) -> Result<(), OtpError> {
        self.attempts.check(identifier).await?;

        let key = otp_key(identifier);
        let Some(stored) = self.store.get(&key).await? else {
            tracing::debug!(identifier = %identifier, "No live OTP");
            return Err(OtpError::Expired);
        };

        if stored != code {
            tracing::debug!(identifier = %identifier, "OTP mismatch");
            return Err(OtpError::Invalid);
        }

        // Single use
        if !self.store.delete(&key).await? {
            tracing::debug!(identifier = %identifier, "OTP consumed concurrently");
            return Err(OtpError::Expired);
        }
        self.attempts.reset(identifier).await?;

        tracing::info!(identifier = %identifier, "OTP verified successfully");
        Ok(())
    }
}
