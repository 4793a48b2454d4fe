//! Per-identifier throttling.
//!
//! Counters live in the key-value store with a fixed window TTL set when
//! the counter is created. Used for both issuance requests and
//! verification attempts.

mod limiter;

pub use limiter::RateLimiter;
