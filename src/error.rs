use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

/// Message attached to a single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
}

/// Field-tagged validation errors. The first message recorded for a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| FieldError {
                message: message.into(),
            });
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed on {}", .0.fields().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),
    #[error("{field} already exists")]
    UniquenessConflict { field: String },
    #[error("not found")]
    NotFound,
    #[error("authentication rejected")]
    AuthenticationRejected,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// Translates the error into the field map shown on the form that caused it.
    pub fn to_field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self {
            AppError::Validation(fields) => return fields.clone(),
            AppError::UniquenessConflict { field } if field == "username" => {
                errors.add("username", "This username already exists!");
            }
            AppError::UniquenessConflict { field } => {
                errors.add(field, format!("This {field} already exists!"));
            }
            AppError::AuthenticationRejected => {
                errors.add("login", "Incorrect username or password");
            }
            other => errors.add("unhandled", other.to_string()),
        }
        errors
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UniquenessConflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::AuthenticationRejected => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                let field = db
                    .constraint()
                    .and_then(constraint_field)
                    .unwrap_or("unknown")
                    .to_string();
                return AppError::UniquenessConflict { field };
            }
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return AppError::NotFound;
        }
        AppError::Storage(anyhow::Error::new(e))
    }
}

// users_username_key -> username
fn constraint_field(name: &str) -> Option<&str> {
    let rest = name.split_once('_').map(|(_, rest)| rest)?;
    rest.strip_suffix("_key")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = match &self {
            AppError::Validation(_) | AppError::UniquenessConflict { .. } => {
                json!({ "error": self.to_string(), "errors": self.to_field_errors() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("currentPassword", "Current Password is required!");
        errors.add("currentPassword", "Current Password is invalid!");
        errors.add("newPassword", "too short");
        assert_eq!(errors.fields().count(), 2);
        assert_eq!(
            errors.message("currentPassword"),
            Some("Current Password is required!")
        );
    }

    #[test]
    fn field_errors_serialize_like_form_errors() {
        let mut errors = FieldErrors::new();
        errors.add("username", "Username is required!");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["username"]["message"], "Username is required!");
    }

    #[test]
    fn conflict_on_username_maps_to_username_field() {
        let err = AppError::UniquenessConflict {
            field: "username".into(),
        };
        let errors = err.to_field_errors();
        assert_eq!(
            errors.message("username"),
            Some("This username already exists!")
        );
    }

    #[test]
    fn storage_errors_are_kept_opaque_but_visible() {
        let err = AppError::Storage(anyhow::anyhow!("connection reset"));
        let errors = err.to_field_errors();
        assert_eq!(errors.message("unhandled"), Some("connection reset"));
    }

    #[test]
    fn constraint_names_resolve_to_fields() {
        assert_eq!(constraint_field("users_username_key"), Some("username"));
        assert_eq!(constraint_field("users_pkey"), None);
    }
}
