// Client error taxonomy
use serde_json::Value;
use thiserror::Error;

use crate::routes::Route;

/// Errors surfaced by the gateway, refresh protocol and auth flows.
///
/// `Clone` so a single refresh outcome can be handed to every caller waiting
/// on the same in-flight refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    // Transport-level failure: connect, timeout, TLS, body read
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    // 401 after the single retry, or an auth requirement that failed locally
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Any other non-2xx response
    #[error("Request failed ({status}): {message}")]
    ApplicationError { status: u16, message: String },

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    // Local form validation, never reaches the network
    #[error("{0}")]
    Validation(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

impl ClientError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        ClientError::ApplicationError {
            status,
            message: message.into(),
        }
    }

    /// True when the failure means the stored session is no longer usable.
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized(_) | ClientError::NoRefreshToken | ClientError::RefreshFailed(_)
        )
    }

    /// Where the user should be sent after this failure, if anywhere.
    pub fn redirect_target(&self) -> Option<Route> {
        if self.is_session_terminal() {
            Some(Route::Auth)
        } else {
            None
        }
    }

    /// Text suitable for a transient user notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::ApplicationError { message, .. } => message.clone(),
            ClientError::Validation(message) => message.clone(),
            ClientError::Unauthorized(_) | ClientError::NoRefreshToken | ClientError::RefreshFailed(_) => {
                SESSION_EXPIRED_MESSAGE.to_string()
            }
            ClientError::NetworkFailure(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ClientError::InvalidResponse(message) => message.clone(),
            ClientError::InvalidRequest(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::NetworkFailure(format!("request timed out: {}", err))
        } else {
            ClientError::NetworkFailure(err.to_string())
        }
    }
}

/// Pull the backend's human-readable detail out of an error body.
///
/// Looks at `detail`, then `message`, then `error`; returns `None` when none is a string.
pub fn backend_detail(body: &Value) -> Option<String> {
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| v.as_str().map(str::to_string))
}

/// Backend detail when present, otherwise a generic message carrying the status.
pub fn detail_or_fallback(status: u16, body: &Value) -> String {
    backend_detail(body).unwrap_or_else(|| status_fallback(status))
}

pub(crate) fn status_fallback(status: u16) -> String {
    format!("Request failed with status {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_prefers_detail_field() {
        let body = json!({"detail": "Invalid credentials", "message": "ignored"});
        assert_eq!(backend_detail(&body).as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn detail_falls_back_through_fields() {
        assert_eq!(backend_detail(&json!({"error": "boom"})).as_deref(), Some("boom"));
        assert_eq!(backend_detail(&json!({"detail": 42})), None);
        assert_eq!(detail_or_fallback(502, &Value::Null), "Request failed with status 502");
    }

    #[test]
    fn terminal_errors_redirect_to_login() {
        assert_eq!(ClientError::NoRefreshToken.redirect_target(), Some(Route::Auth));
        assert_eq!(ClientError::RefreshFailed("401".into()).redirect_target(), Some(Route::Auth));
        assert_eq!(ClientError::application(500, "boom").redirect_target(), None);
        assert_eq!(ClientError::NetworkFailure("down".into()).redirect_target(), None);
    }

    #[test]
    fn user_message_uses_backend_detail() {
        assert_eq!(ClientError::application(400, "Username already exists").user_message(), "Username already exists");
        assert_eq!(ClientError::NoRefreshToken.user_message(), SESSION_EXPIRED_MESSAGE);
    }
}
