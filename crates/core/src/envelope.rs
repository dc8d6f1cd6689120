//! Uniform response envelope returned by every backend endpoint.
//!
//! The backend always answers `{code, message, data}`. The HTTP status is not
//! authoritative; `code` decides between success, expired credentials and a
//! business failure.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Application code for a successful call.
pub const SUCCESS_CODE: i64 = 200;

/// Application code for expired or invalid credentials.
pub const UNAUTHORIZED_CODE: i64 = 401;

/// Raw envelope as received from the backend.
///
/// `data` is kept as an untyped JSON value until the outcome is known, so a
/// failure envelope with a `null` payload never trips the caller's decoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

/// Classified envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOutcome {
    Success(Value),
    Unauthorized { message: String },
    Failure { code: i64, message: String },
}

impl ApiEnvelope {
    /// Parse an envelope from a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn outcome(self) -> EnvelopeOutcome {
        match self.code {
            SUCCESS_CODE => EnvelopeOutcome::Success(self.data),
            UNAUTHORIZED_CODE => EnvelopeOutcome::Unauthorized {
                message: self.message,
            },
            code => EnvelopeOutcome::Failure {
                code,
                message: self.message,
            },
        }
    }
}

/// Decode a success payload into the endpoint's result type.
///
/// Shape mismatches are rejected rather than patched over.
pub fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(data)
}
