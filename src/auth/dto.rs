use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;

/// `POST /login` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Presence checks run before any credential lookup.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.username.is_empty() {
            errors.add("username", "Username is required!");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required!");
        }
        errors.into_result()
    }
}

/// Login page state after a redirect.
#[derive(Debug, Serialize)]
pub struct LoginView {
    pub username: Option<String>,
    pub errors: FieldErrors,
}
