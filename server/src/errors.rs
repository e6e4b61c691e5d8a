// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_flow::FlowError;

#[derive(Debug, Error)]
pub enum AppError {
  /// Malformed or missing input, including over-cancellation.
  #[error("Validation Error: {0}")]
  Validation(String),

  /// Missing, malformed or expired credentials.
  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// Authenticated, but not allowed to touch this resource.
  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The order is in a state that forbids the operation.
  #[error("Invalid State: {0}")]
  InvalidState(String),

  /// A concurrent writer changed the row first. Safe to retry.
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

/// Error payload shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl AppError {
  pub fn body(&self) -> ErrorBody {
    let (error, details) = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::InvalidState(m)
      | AppError::Conflict(m) => (m.clone(), None),
      AppError::Config(m) => ("Configuration issue".to_string(), Some(m.clone())),
      AppError::Sqlx(e) => ("Database operation failed".to_string(), Some(e.to_string())),
      AppError::Workflow { source } => ("Workflow processing error".to_string(), Some(source.to_string())),
      AppError::Internal(m) => ("An internal error occurred".to_string(), Some(m.clone())),
    };
    ErrorBody { error, details }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    HttpResponse::build(status).json(self.body())
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
