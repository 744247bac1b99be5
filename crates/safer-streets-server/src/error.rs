//! API error type and its JSON rendering

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use safer_streets_core::{AreaSummary, CoreError, ErrorBody};
use thiserror::Error;
use tracing::error;

/// Fixed rejection text. Never varies with the presented key.
pub const UNAUTHORIZED_MESSAGE: &str = "API key missing or invalid";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API key missing or invalid")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Ambiguous {
        message: String,
        candidates: Vec<AreaSummary>,
    },

    #[error("{0}")]
    InsufficientData(String),

    #[error("{0}")]
    InvalidQuery(String),

    /// Detail is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Ambiguous { .. } => StatusCode::CONFLICT,
            ApiError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable kind, as sent in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Ambiguous { .. } => "ambiguous",
            ApiError::InsufficientData(_) => "insufficient_data",
            ApiError::InvalidQuery(_) => "invalid_query",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (message, candidates) = match self {
            ApiError::Internal(_) => ("internal server error".to_string(), None),
            ApiError::Ambiguous { message, candidates } => (message.clone(), Some(candidates.clone())),
            other => (other.to_string(), None),
        };
        ErrorBody {
            error: self.kind().to_string(),
            message,
            candidates,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AmbiguousArea { ref candidates, .. } => ApiError::Ambiguous {
                candidates: candidates.clone(),
                message: err.to_string(),
            },
            CoreError::InsufficientData { .. } => ApiError::InsufficientData(err.to_string()),
            CoreError::InvalidQuery { message } => ApiError::InvalidQuery(message),
            CoreError::DataLoad { .. } => ApiError::Internal(err.to_string()),
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }
        (self.status(), Json(self.body())).into_response()
    }
}
