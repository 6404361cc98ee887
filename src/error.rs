//! Error types for Libraria server

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Stable error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NotAuthenticated = 2,
    PermissionDenied = 3,
    DbFailure = 4,
    NotFound = 5,
    BadValue = 6,
}

/// Per-field validation messages, keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid fields: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    InvalidFields(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Single-field validation error
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AppError::InvalidFields(fields)
    }

    /// Field error for a reference to a row that does not exist
    pub fn missing_reference(name: &str, id: i32) -> Self {
        Self::field(name, format!("Invalid pk \"{}\" - object does not exist.", id))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::InvalidFields(fields)
    }
}

pub const FIELD_REQUIRED: &str = "This field is required.";

/// Pull the offending field out of a serde message such as
/// "missing field `isbn` at line 1 column 80" or
/// "genre: invalid type: string \"x\", expected i32 at line 1 column 12"
fn field_from_serde_message(text: &str) -> Option<(String, String)> {
    let detail = text.split_once("target type: ").map_or(text, |(_, rest)| rest);
    let detail = detail.split(" at line ").next().unwrap_or(detail);

    if let Some((_, rest)) = detail.split_once("missing field `") {
        let name = rest.split('`').next()?;
        return Some((name.to_string(), FIELD_REQUIRED.to_string()));
    }

    let (path, message) = detail.split_once(": ")?;
    if path.is_empty() || path == "." || path.contains(char::is_whitespace) {
        return None;
    }
    Some((path.to_string(), message.to_string()))
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        if let JsonRejection::JsonDataError(_) = rejection {
            if let Some((field, message)) = field_from_serde_message(&text) {
                return AppError::field(&field, message);
            }
        }
        AppError::BadRequest(text)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Field-level messages, present for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, code, message) = match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg)
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg),
            AppError::InvalidFields(errors) => {
                fields = Some(errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadValue,
                    "Validation failed".to_string(),
                )
            }
            AppError::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                ErrorCode::NotFound,
                "Not found".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Translate a unique-constraint violation into a field error, pass anything else through
pub(crate) fn map_unique_violation(err: sqlx::Error, field: &str, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::field(field, message),
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use validator::Validate;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn field_errors_render_as_400_with_fields() {
        let response = AppError::field("user", "This field is required.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "BadValue");
        assert_eq!(body["fields"]["user"][0], "This field is required.");
    }

    #[tokio::test]
    async fn permission_errors_render_as_403_without_fields() {
        let response = AppError::Authorization("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["message"], "nope");
        assert!(body.get("fields").is_none());
    }

    #[tokio::test]
    async fn row_not_found_is_404() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_field_becomes_required_error() {
        let parsed = field_from_serde_message(
            "Failed to deserialize the JSON body into the target type: missing field `isbn` at line 1 column 80",
        );
        assert_eq!(parsed, Some(("isbn".to_string(), FIELD_REQUIRED.to_string())));
    }

    #[test]
    fn wrong_type_is_reported_on_its_field() {
        let parsed = field_from_serde_message(
            "Failed to deserialize the JSON body into the target type: book: invalid type: string \"x\", expected i32 at line 1 column 12",
        );
        assert_eq!(
            parsed,
            Some(("book".to_string(), "invalid type: string \"x\", expected i32".to_string()))
        );
    }

    #[test]
    fn root_level_errors_have_no_field() {
        assert_eq!(
            field_from_serde_message(
                "Failed to deserialize the JSON body into the target type: invalid type: sequence, expected struct CreateBook at line 1 column 0"
            ),
            None
        );
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
    }

    #[test]
    fn validation_errors_keep_field_names() {
        let errors = Sample { name: "ab".into() }.validate().unwrap_err();
        match AppError::from(errors) {
            AppError::InvalidFields(fields) => assert_eq!(fields["name"], vec!["too short"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
