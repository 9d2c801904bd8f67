use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("An organization cannot be its own parent")]
    SelfParent,

    #[error("An organization cannot be moved under one of its own descendants")]
    CircularReference,

    #[error("Organization still has child organizations; delete them first or force the deletion")]
    HasChildren,

    #[error("User {user} already belongs to organization {organization}")]
    DuplicateMembership { user: String, organization: Uuid },

    #[error("User {0} already has a primary organization")]
    PrimaryMembershipTaken(String),

    #[error("Organization hierarchy contains a cycle at {0}")]
    CorruptHierarchy(Uuid),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", Some(msg.clone())),
            AppError::SelfParent => (StatusCode::CONFLICT, "Self Parent", Some(self.to_string())),
            AppError::CircularReference => {
                (StatusCode::CONFLICT, "Circular Reference", Some(self.to_string()))
            }
            AppError::HasChildren => (StatusCode::CONFLICT, "Has Children", Some(self.to_string())),
            AppError::DuplicateMembership { .. } => {
                (StatusCode::CONFLICT, "Duplicate Membership", Some(self.to_string()))
            }
            AppError::PrimaryMembershipTaken(_) => {
                (StatusCode::CONFLICT, "Primary Membership Taken", Some(self.to_string()))
            }
            AppError::CorruptHierarchy(id) => {
                tracing::error!("Corrupt organization hierarchy at {}", id);
                (StatusCode::INTERNAL_SERVER_ERROR, "Corrupt Hierarchy", None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad Request", Some(msg.clone()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", None)
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database Error", None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "Validation Error", Some(msg.clone()))
            }
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            message: message.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

/// Helper to convert anyhow errors to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = AppError::NotFound("Organization not found".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_structural_errors_are_conflicts() {
        for err in [AppError::SelfParent, AppError::CircularReference, AppError::HasChildren] {
            assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_structural_errors_are_distinct() {
        let messages = [
            AppError::SelfParent.to_string(),
            AppError::CircularReference.to_string(),
            AppError::HasChildren.to_string(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_not_found("Item not found");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
