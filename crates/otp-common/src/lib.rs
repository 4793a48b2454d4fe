//! # OTP Common
//!
//! Shared types, errors, and policy constants used by the OTP gate.
//!
//! ## Modules
//! - `types` - Identifiers and request/response wire types
//! - `error` - The `OtpError` taxonomy
//! - `constants` - TTLs, throttling thresholds, and store key prefixes

pub mod constants;
pub mod error;
pub mod types;

pub use error::OtpError;
pub use types::*;
