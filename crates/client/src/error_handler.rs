//! Maps client errors to user-visible notices.
//!
//! Expired sessions are handled centrally by the pipeline (forced logout and
//! redirect), so they produce no additional notice here.

use crate::error::ClientError;
use crate::notify::{NoticeLevel, Notifier};

const NETWORK_MESSAGE: &str = "network error, please try again later";
const UNEXPECTED_MESSAGE: &str = "unexpected error, please reload and try again";

/// The message to show for `err`, or `None` when it must stay silent.
pub fn user_message(err: &ClientError) -> Option<String> {
    match err {
        ClientError::SessionExpired => None,
        ClientError::Application { message, .. } => Some(message.clone()),
        ClientError::Validation(message) => Some(message.clone()),
        ClientError::Transport(_) | ClientError::Decode(_) => Some(NETWORK_MESSAGE.to_string()),
        ClientError::NotAuthenticated => Some("please sign in first".to_string()),
        ClientError::MalformedSession(_) | ClientError::Storage(_) | ClientError::Config(_) => {
            Some(UNEXPECTED_MESSAGE.to_string())
        }
    }
}

/// Log `err` and raise the matching notice.
pub fn report_error(notifier: &dyn Notifier, err: &ClientError) {
    match err {
        ClientError::SessionExpired => {
            tracing::debug!("session expiry already handled; suppressing notice");
        }
        ClientError::Application { code, message } => {
            tracing::info!(code, %message, "request rejected by backend");
        }
        other => tracing::error!(error = %other, "request failed"),
    }

    if let Some(message) = user_message(err) {
        notifier.notify(NoticeLevel::Error, &message);
    }
}
