//! One-time passcode lifecycle: issuance, delivery, verification.
//!
//! A live code is stored at `otp:{identifier}` with a fixed TTL. A new
//! issuance overwrites any previous code; a successful verification
//! deletes it.

mod delivery;
mod issuer;
mod verifier;

pub use delivery::{Dispatcher, LogDispatcher};
pub use issuer::OtpIssuer;
pub use verifier::OtpVerifier;

use otp_common::Identifier;
use otp_common::constants::store_keys;

/// Store key holding the live code for `identifier`
pub fn otp_key(identifier: &Identifier) -> String {
    format!("{}{}", store_keys::OTP_PREFIX, identifier.as_str())
}
