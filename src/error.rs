use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not an approved member of this class")]
    NotAMember,

    #[error("Already an approved member of this class")]
    AlreadyMember,

    #[error("A join application is already pending")]
    DuplicatePending,

    #[error("No pending application for this user")]
    NoPendingApplication,

    #[error("The owner's membership cannot be changed")]
    CannotModifyOwner,

    #[error("You cannot change your own membership")]
    CannotModifySelf,

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Class not found")]
    ClassNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Task not accessible")]
    TaskNotAccessible,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// Stable machine-readable code, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "INTERNAL_ERROR",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NotAMember => "NOT_A_MEMBER",
            AppError::AlreadyMember => "ALREADY_MEMBER",
            AppError::DuplicatePending => "DUPLICATE_PENDING",
            AppError::NoPendingApplication => "NO_PENDING_APPLICATION",
            AppError::CannotModifyOwner => "CANNOT_MODIFY_OWNER",
            AppError::CannotModifySelf => "CANNOT_MODIFY_SELF",
            AppError::InvalidAction(_) => "INVALID_ACTION",
            AppError::InvalidRange(_) => "INVALID_RANGE",
            AppError::ClassNotFound => "CLASS_NOT_FOUND",
            AppError::TaskNotFound => "TASK_NOT_FOUND",
            AppError::TaskNotAccessible => "TASK_NOT_ACCESSIBLE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InternalServerError => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_)
            | AppError::NotAMember
            | AppError::TaskNotAccessible => StatusCode::FORBIDDEN,
            AppError::AlreadyMember | AppError::DuplicatePending => StatusCode::CONFLICT,
            AppError::NoPendingApplication
            | AppError::ClassNotFound
            | AppError::TaskNotFound => StatusCode::NOT_FOUND,
            AppError::CannotModifyOwner
            | AppError::CannotModifySelf
            | AppError::InvalidAction(_)
            | AppError::InvalidRange(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// True when `err` is a unique-constraint violation touching `needle`
/// (SQLite puts the offending column list in the message).
pub fn is_unique_violation(err: &sqlx::Error, needle: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.message().contains(needle),
        _ => false,
    }
}
