//! Code delivery to the identifier's channel.

use async_trait::async_trait;
use otp_common::{Identifier, IdentifierKind, OtpError};

/// Where a code is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    Email,
}

impl From<IdentifierKind> for Channel {
    fn from(kind: IdentifierKind) -> Self {
        match kind {
            IdentifierKind::Phone => Self::Sms,
            IdentifierKind::Email => Self::Email,
        }
    }
}

/// Sends a freshly issued code to its recipient
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, identifier: &Identifier, code: &str) -> Result<(), OtpError>;
}

/// Records the dispatch without contacting a provider.
///
/// Only the channel and the masked identifier are logged, never the code.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn dispatch(&self, identifier: &Identifier, _code: &str) -> Result<(), OtpError> {
        tracing::info!(
            identifier = %identifier,
            channel = ?Channel::from(identifier.kind()),
            "OTP dispatched"
        );
        Ok(())
    }
}
