//! Core types shared across OTP gate components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MAX_IDENTIFIER_LEN, OTP_LENGTH};
use crate::error::OtpError;

/// Which channel an identifier reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Phone,
    Email,
}

/// The recipient of a code: a phone number or an email address.
///
/// Surrounding whitespace is trimmed and email addresses are lower-cased,
/// so `" User@Example.com "` and `"user@example.com"` share one OTP record
/// and one rate counter. Phone numbers are otherwise kept as supplied.
///
/// The kind always follows the value: anything containing `@` is an email.
/// Issuance and verification therefore normalize a value the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    kind: IdentifierKind,
    value: String,
}

impl Identifier {
    pub fn phone(raw: &str) -> Result<Self, OtpError> {
        if raw.contains('@') {
            return Err(OtpError::InvalidRequest(
                "'phone' must not be an email address".into(),
            ));
        }
        Self::build(IdentifierKind::Phone, raw.trim().to_string())
    }

    pub fn email(raw: &str) -> Result<Self, OtpError> {
        if !raw.contains('@') {
            return Err(OtpError::InvalidRequest(
                "'email' must contain '@'".into(),
            ));
        }
        Self::build(IdentifierKind::Email, raw.trim().to_lowercase())
    }

    /// Classify a free-form identifier (as submitted for verification)
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        if raw.contains('@') {
            Self::email(raw)
        } else {
            Self::phone(raw)
        }
    }

    fn build(kind: IdentifierKind, value: String) -> Result<Self, OtpError> {
        if value.is_empty() {
            return Err(OtpError::InvalidRequest("identifier must not be empty".into()));
        }
        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(OtpError::InvalidRequest(format!(
                "identifier must be at most {MAX_IDENTIFIER_LEN} bytes"
            )));
        }
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Log-safe rendering: last four characters of a phone number, or the
    /// first character of an email's local part plus its domain.
    pub fn masked(&self) -> String {
        match self.kind {
            IdentifierKind::Phone => {
                let chars: Vec<char> = self.value.chars().collect();
                if chars.len() <= 4 {
                    "****".to_string()
                } else {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("***{tail}")
                }
            }
            IdentifierKind::Email => match self.value.split_once('@') {
                Some((local, domain)) => {
                    let head = local.chars().next().map(String::from).unwrap_or_default();
                    format!("{head}***@{domain}")
                }
                None => "***".to_string(),
            },
        }
    }
}

impl fmt::Display for Identifier {
    /// Displays the masked form so identifiers can go straight into logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Issuance request body. Exactly one of `phone` / `email` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SendOtpRequest {
    /// Resolve the single identifier this request names.
    ///
    /// Blank strings count as absent.
    pub fn identifier(&self) -> Result<Identifier, OtpError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (present(&self.phone), present(&self.email)) {
            (Some(phone), None) => Identifier::phone(&phone),
            (None, Some(email)) => Identifier::email(&email),
            (None, None) => Err(OtpError::InvalidRequest(
                "Either 'phone' or 'email' must be provided".into(),
            )),
            (Some(_), Some(_)) => Err(OtpError::InvalidRequest(
                "Provide only one of 'phone' or 'email'".into(),
            )),
        }
    }
}

/// Verification request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub identifier: String,
    pub code: String,
}

impl VerifyOtpRequest {
    /// Check shape and return the parsed identifier alongside the code
    pub fn validate(&self) -> Result<(Identifier, &str), OtpError> {
        let identifier = Identifier::parse(&self.identifier)?;
        if !is_well_formed_code(&self.code) {
            return Err(OtpError::InvalidRequest(format!(
                "code must be exactly {OTP_LENGTH} digits"
            )));
        }
        Ok((identifier, &self.code))
    }
}

/// True for strings of exactly `OTP_LENGTH` ASCII digits
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Successful issuance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
    /// Plaintext code, only present when debug mode is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_otp: Option<String>,
}

/// Successful verification response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub verified: bool,
}

/// Body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl From<&OtpError> for ErrorResponse {
    fn from(err: &OtpError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            code: err.kind().to_string(),
        }
    }
}
