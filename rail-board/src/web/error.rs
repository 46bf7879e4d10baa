//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::stream::{ProviderError, StreamError};

use super::dto::ErrorResponse;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// Request conflicts with the stream's current state
    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Unavailable { message: String },
}

impl From<StreamError> for AppError {
    fn from(e: StreamError) -> Self {
        let message = e.to_string();
        match e {
            StreamError::ConcurrentRequestRejected(_)
            | StreamError::NotReady(_)
            | StreamError::NothingToExtend
            | StreamError::NotBusy(_) => AppError::Conflict { message },
            StreamError::Provider(e) => e.into(),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        let message = e.to_string();
        match e {
            ProviderError::UnknownStation(_) => AppError::NotFound { message },
            ProviderError::Unavailable(_) => AppError::Unavailable { message },
            ProviderError::InvalidRecord(_) => AppError::BadRequest { message },
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        warn!(%status, %message, "Request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
