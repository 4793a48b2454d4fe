//! Common error types for OTP gate components.

use thiserror::Error;

/// Errors surfaced by the issuing and verification flows
#[derive(Debug, Error)]
pub enum OtpError {
    /// Malformed input: missing identifier, malformed code, bad JSON
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Issuance or verification throttle exceeded
    #[error("{0}")]
    TooManyRequests(String),

    /// No live code for the identifier (never issued, consumed, or expired)
    #[error("OTP expired or not found")]
    Expired,

    /// Submitted code does not match the live one
    #[error("Invalid OTP")]
    Invalid,

    /// Key-value store unreachable or failing
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OtpError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::TooManyRequests(_) => 429,
            Self::Expired => 410,
            Self::Invalid => 400,
            Self::StoreUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::TooManyRequests(_) => "too_many_requests",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns true if the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TooManyRequests(_) | Self::StoreUnavailable(_))
    }
}
