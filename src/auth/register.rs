use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegistrationForm {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            password_confirmation: password_confirmation.into(),
        }
    }

    /// Local checks that must pass before anything is sent.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.password != self.password_confirmation {
            return Err(ClientError::Validation("Passwords do not match".to_string()));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ClientError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}
