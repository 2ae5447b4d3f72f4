use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// ValidationErrors
///
/// Accumulates per-field validation messages. Serialized as the `errors`
/// object of a 422 response: `{"field": ["message", ...], ...}`.
#[derive(Debug, Default, Clone)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Builds a single-field error in one call, the common case for login
    /// and ownership failures.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finishes a validation pass: Ok(()) when clean, otherwise the
    /// accumulated errors as an ApiError ready to bubble up with `?`.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }
}

/// ApiError
///
/// The request-boundary error taxonomy. Every handler returns
/// `Result<_, ApiError>`; the IntoResponse impl maps each variant to its
/// status code and JSON body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("unauthenticated")]
    Unauthenticated,

    /// The permission matrix denied the (module, action) pair.
    #[error("permission denied for {module}")]
    Forbidden { module: &'static str },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Shorthand for a single-field 422, the common case for credential
    /// and ownership failures.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationErrors::single(field, message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "The given data was invalid.",
                    "errors": errors.fields(),
                })),
            )
                .into_response(),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Unauthenticated." })),
            )
                .into_response(),
            ApiError::Forbidden { module } => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "message": format!("You do not have permission to access {}.", module),
                })),
            )
                .into_response(),
            ApiError::NotFound(entity) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": format!("{} not found", entity) })),
            )
                .into_response(),
            ApiError::Database(e) => {
                // Surface nothing about the failure to the client.
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
