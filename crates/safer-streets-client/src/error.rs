//! Classified failures of API calls

use reqwest::StatusCode;
use safer_streets_core::{AreaSummary, ErrorBody};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Key missing or rejected. Never retried with the same key.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous: {message}")]
    Ambiguous {
        message: String,
        candidates: Vec<AreaSummary>,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Network failure, timeout or server-side error.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Classify an error response. A body that cannot be read falls back to
    /// the status alone.
    pub fn from_response(status: StatusCode, body: Option<ErrorBody>) -> Self {
        let message = body
            .as_ref()
            .map(|b| b.message.clone())
            .unwrap_or_else(|| status.to_string());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Ambiguous {
                message,
                candidates: body.and_then(|b| b.candidates).unwrap_or_default(),
            },
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::InsufficientData(message),
            s if s.is_server_error() => ClientError::Unavailable(message),
            _ => ClientError::InvalidQuery(message),
        }
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Unavailable(_))
    }

    /// Text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized(_) => {
                "Unauthorized: the API key was rejected. Check SAFER_STREETS_API_KEY.".to_string()
            }
            ClientError::NotFound(message) => format!("Not found: {}", message),
            ClientError::Ambiguous { candidates, .. } => {
                let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                format!("Several matches, please choose one of: {}", names.join(", "))
            }
            ClientError::InsufficientData(message) => format!("Not enough data: {}", message),
            ClientError::Unavailable(_) => {
                "The Safer Streets service is unavailable. Please try again later.".to_string()
            }
            ClientError::InvalidQuery(message) => format!("Invalid request: {}", message),
            ClientError::Decode(_) => "The service returned an unexpected response.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            // connect, timeout, body and redirect failures
            ClientError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safer_streets_core::AreaId;

    fn body(error: &str, message: &str) -> Option<ErrorBody> {
        Some(ErrorBody {
            error: error.to_string(),
            message: message.to_string(),
            candidates: None,
        })
    }

    #[test]
    fn test_status_classification() {
        let err = ClientError::from_response(StatusCode::FORBIDDEN, body("unauthorized", "API key missing or invalid"));
        assert!(matches!(err, ClientError::Unauthorized(_)));
        assert!(!err.is_retryable());

        let err = ClientError::from_response(StatusCode::NOT_FOUND, body("not_found", "no area matches 'Nowhere'"));
        assert_eq!(err, ClientError::NotFound("no area matches 'Nowhere'".to_string()));

        let err = ClientError::from_response(StatusCode::UNPROCESSABLE_ENTITY, None);
        assert!(matches!(err, ClientError::InsufficientData(_)));

        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, None);
        assert!(err.is_retryable());

        let err = ClientError::from_response(StatusCode::BAD_REQUEST, body("invalid_query", "bad month"));
        assert_eq!(err, ClientError::InvalidQuery("bad month".to_string()));
    }

    #[test]
    fn test_ambiguous_keeps_candidates() {
        let err = ClientError::from_response(
            StatusCode::CONFLICT,
            Some(ErrorBody {
                error: "ambiguous".to_string(),
                message: "'Yorkshire' matches 2 areas".to_string(),
                candidates: Some(vec![
                    AreaSummary { id: AreaId::from("E23000009"), name: "North Yorkshire".to_string() },
                    AreaSummary { id: AreaId::from("E23000011"), name: "South Yorkshire".to_string() },
                ]),
            }),
        );
        assert_eq!(
            err.user_message(),
            "Several matches, please choose one of: North Yorkshire, South Yorkshire"
        );
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let not_found = ClientError::NotFound("x".into()).user_message();
        let unavailable = ClientError::Unavailable("x".into()).user_message();
        let unauthorized = ClientError::Unauthorized("x".into()).user_message();
        assert!(not_found.starts_with("Not found"));
        assert!(unavailable.contains("unavailable"));
        assert!(unauthorized.starts_with("Unauthorized"));
        assert_ne!(not_found, unavailable);
    }
}
