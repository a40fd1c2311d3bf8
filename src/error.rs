use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::assistant::AssistantError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Empty or out-of-bounds user input; reported inline, no state change.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Description cannot be empty.")] EmptyDescription,
    #[error("Name cannot be empty.")] EmptyName,
    #[error("Student ID cannot be empty.")] EmptyStudentId,
    #[error("Please provide some keywords or a short sentence about your complaint.")] EmptyKeywords,
    #[error("File is too large. Please select a file under {limit_mb}MB.")] FileTooLarge { limit_mb: usize },
    #[error("Please select a valid image file (PNG, JPEG, etc.).")] NotAnImage,
    #[error("No file was provided.")] MissingFile,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error("Invalid Student ID. Please check the format and try again.")] InvalidStudentId,
    #[error("Invalid admin credentials.")] InvalidAdminCredentials,
    #[error("You must be logged in.")] NoSession,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Unauthorized(String),
    #[error("forbidden")] Forbidden,
    #[error("{0}")] BadGateway(String),
    #[error("internal error")] Internal,
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(v) => v.into(),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::Validation(v) => v.into(),
            _ => ApiError::BadGateway(crate::assistant::USER_FACING_FAILURE.into()),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
