use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::logic::GeneratorError;
use crate::upstream::UpstreamError;

/// Error body: `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            detail: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

pub fn not_found(what: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, &format!("{} not found", what))
}

pub fn unprocessable(message: &str) -> ApiError {
    api_error(StatusCode::UNPROCESSABLE_ENTITY, message)
}

pub fn internal(error: anyhow::Error) -> ApiError {
    log::error!("Store error: {:#}", error);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string())
}

/// Upstream statuses are passed through unchanged
pub fn upstream_error(error: UpstreamError) -> ApiError {
    let status = match &error {
        UpstreamError::Status { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        UpstreamError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        UpstreamError::Decode(_) | UpstreamError::NotConfigured => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, &error.to_string())
}

pub fn generator_error(error: GeneratorError) -> ApiError {
    log::error!("Tweet generation failed: {}", error);
    let status = match &error {
        GeneratorError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        GeneratorError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        GeneratorError::Upstream { .. } | GeneratorError::EmptyCompletion => {
            StatusCode::BAD_GATEWAY
        }
    };
    api_error(status, &error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_passed_through() {
        let (status, Json(body)) = upstream_error(UpstreamError::Status {
            status: 418,
            body: "teapot".to_string(),
        });
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body.detail, "External API error: teapot");
    }

    #[test]
    fn test_missing_key_is_server_error() {
        let (status, Json(body)) = upstream_error(UpstreamError::NotConfigured);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.detail.contains("TWITTER_CLONE_API_KEY"));
    }

    #[test]
    fn test_generator_error_mapping() {
        let (status, _) = generator_error(GeneratorError::Upstream {
            status: 401,
            body: "bad key".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (status, _) = generator_error(GeneratorError::EmptyCompletion);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
