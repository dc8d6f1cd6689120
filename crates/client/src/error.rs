//! Client error taxonomy.

use jadmin_core::ModelError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Backend unreachable or the connection failed mid-flight.
    #[error("network error: {0}")]
    Transport(String),

    /// Response body was not a well-formed envelope, or its payload did not
    /// match the endpoint's shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Backend reported expired or invalid credentials. The session has
    /// already been destroyed when this is raised.
    #[error("session expired, please sign in again")]
    SessionExpired,

    /// Backend reported a business failure.
    #[error("{message} (code {code})")]
    Application { code: i64, message: String },

    #[error("not signed in")]
    NotAuthenticated,

    /// Persisted session record could not be parsed.
    #[error("malformed persisted session: {0}")]
    MalformedSession(String),

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn application(code: i64, message: impl Into<String>) -> Self {
        Self::Application {
            code,
            message: message.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Transport-level failures are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

impl From<ModelError> for ClientError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::Validation(msg) | ModelError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(ClientError::transport("refused").is_transient());
        assert!(ClientError::decode("eof").is_transient());
        assert!(!ClientError::SessionExpired.is_transient());
        assert!(!ClientError::application(500, "boom").is_transient());
        assert!(!ClientError::NotAuthenticated.is_transient());
    }

    #[test]
    fn application_error_shows_server_message() {
        let err = ClientError::application(400, "username taken");
        assert_eq!(err.to_string(), "username taken (code 400)");
    }

    #[test]
    fn model_errors_become_validation() {
        let err: ClientError = ModelError::validation("bad email").into();
        assert_eq!(err, ClientError::Validation("bad email".into()));
    }
}
