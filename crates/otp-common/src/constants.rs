//! Shared constants for OTP gate components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Number of digits in a generated code
pub const OTP_LENGTH: usize = 6;

/// Size of the code space (`000000`..=`999999`)
pub const OTP_SPACE: u32 = 1_000_000;

/// OTP record lifetime (5 minutes)
pub const OTP_TTL_SECS: u64 = 300;

/// Issuance requests allowed per identifier within one window
pub const ISSUE_MAX_REQUESTS: u64 = 5;

/// Issuance rate window (10 minutes)
pub const ISSUE_WINDOW_SECS: u64 = 600;

/// Default verification attempts allowed per identifier within one window
pub const VERIFY_MAX_ATTEMPTS: u64 = 5;

/// Verification attempt window, aligned with the code lifetime
pub const VERIFY_WINDOW_SECS: u64 = OTP_TTL_SECS;

/// Longest identifier accepted, in bytes
pub const MAX_IDENTIFIER_LEN: usize = 254;

/// Store key prefixes
pub mod store_keys {
    /// Live code: otp:{identifier}
    pub const OTP_PREFIX: &str = "otp:";

    /// Issuance counter: rate_limit:otp:{identifier}
    pub const ISSUE_RATE_PREFIX: &str = "rate_limit:otp:";

    /// Verification attempt counter: rate_limit:verify:{identifier}
    pub const VERIFY_RATE_PREFIX: &str = "rate_limit:verify:";
}
