//! Login and registration flows.
//!
//! Both call public backend endpoints and, on success, write the complete
//! session in one go before deciding where the user lands.

mod register;

pub use register::{RegistrationForm, MIN_PASSWORD_LENGTH};

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{status_fallback, ClientError};
use crate::gateway::Gateway;
use crate::routes::Route;
use crate::session::{Session, SessionManager};

pub const LOGIN_PATH: &str = "login/";
pub const REGISTER_PATH: &str = "register/";

const LOGIN_FALLBACK_MESSAGE: &str = "Login failed. Please check your credentials.";
const REGISTER_FALLBACK_MESSAGE: &str = "Registration failed. Please try again.";

/// Token payload returned by both login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_admin: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// The backend has sent the admin flag both as a bool and as "true"/"false"
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Missing(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
        Flag::Missing(()) => false,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub session: Session,
    pub redirect: Route,
    pub message: String,
}

pub struct AuthFlow {
    gateway: Arc<Gateway>,
}

impl AuthFlow {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    fn session(&self) -> &SessionManager {
        self.gateway.session()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let body = json!({ "username": username, "password": password });

        let result = self
            .gateway
            .send_public(Method::POST, LOGIN_PATH, Some(&body))
            .await
            .and_then(parse_tokens);

        match result {
            Ok(payload) => Ok(self.establish(username, payload, "Logged in successfully")),
            Err(e) => {
                warn!(username, "login failed: {}", e);
                // Stale tokens from an earlier session must not survive a failed login
                self.session().clear_tokens();
                Err(with_fallback(e, LOGIN_FALLBACK_MESSAGE))
            }
        }
    }

    /// Validates locally, then registers. Stored credentials are untouched on failure.
    pub async fn register(&self, form: &RegistrationForm) -> Result<LoginOutcome, ClientError> {
        form.validate()?;

        let body = json!({
            "username": form.username,
            "email": form.email,
            "password": form.password,
            "password_confirmation": form.password_confirmation,
        });

        let payload = self
            .gateway
            .send_public(Method::POST, REGISTER_PATH, Some(&body))
            .await
            .and_then(parse_tokens)
            .map_err(|e| {
                warn!(username = %form.username, "registration failed: {}", e);
                with_fallback(e, REGISTER_FALLBACK_MESSAGE)
            })?;

        Ok(self.establish(&form.username, payload, "Registered successfully"))
    }

    pub fn logout(&self) {
        info!("logging out");
        self.session().clear_session();
    }

    fn establish(&self, username: &str, payload: ValidTokens, default_message: &str) -> LoginOutcome {
        let session = Session::new(payload.access_token, payload.refresh_token, username.to_string(), payload.is_admin);
        self.session().set_session(session.clone());

        info!(username, is_admin = payload.is_admin, "session established");

        let message = payload.message.unwrap_or_else(|| {
            if payload.is_admin {
                "Logged in as Admin".to_string()
            } else {
                default_message.to_string()
            }
        });

        LoginOutcome {
            session,
            redirect: if payload.is_admin { Route::Admin } else { Route::Home },
            message,
        }
    }
}

struct ValidTokens {
    access_token: String,
    refresh_token: String,
    is_admin: bool,
    message: Option<String>,
}

fn parse_tokens(body: serde_json::Value) -> Result<ValidTokens, ClientError> {
    let payload: TokenPayload =
        serde_json::from_value(body).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

    match (payload.access_token, payload.refresh_token) {
        (Some(access_token), Some(refresh_token)) if !access_token.is_empty() && !refresh_token.is_empty() => {
            Ok(ValidTokens {
                access_token,
                refresh_token,
                is_admin: payload.is_admin,
                message: payload.message,
            })
        }
        _ => Err(ClientError::InvalidResponse("missing access or refresh token".to_string())),
    }
}

// Backend detail wins; a detail-less rejection or malformed payload gets the
// form's generic message
fn with_fallback(err: ClientError, fallback: &str) -> ClientError {
    match err {
        ClientError::ApplicationError { status, message } if message == status_fallback(status) => {
            ClientError::application(status, fallback)
        }
        ClientError::InvalidResponse(_) => ClientError::InvalidResponse(fallback.to_string()),
        other => other,
    }
}
