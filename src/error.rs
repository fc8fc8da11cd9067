// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! The taxonomy separates user-correctable conditions (missing settings, not
//! connected) from upstream failures (transport vs an explicit error from
//! Google). Upstream details are logged; response bodies stay generic.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not connected to Google Analytics")]
    AuthMissing,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Google API transport error: {0}")]
    Transport(String),

    #[error("Google API error: {0}")]
    Upstream(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Token endpoint returned no access token")]
    TokenMissing,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::ConfigMissing(what) => (
                StatusCode::BAD_REQUEST,
                "config_missing",
                Some(what.to_string()),
            ),
            AppError::AuthMissing => (
                StatusCode::BAD_REQUEST,
                "not_connected",
                Some("Connect to Google Analytics first".to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Transport(msg) => {
                tracing::error!(error = %msg, "Google API transport error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_unavailable",
                    Some("Failed to fetch from Google, check logs".to_string()),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Google API error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    Some("Failed to fetch from Google, check logs".to_string()),
                )
            }
            AppError::OAuth(msg) => (StatusCode::BAD_GATEWAY, "oauth_error", Some(msg.clone())),
            AppError::TokenMissing => (
                StatusCode::BAD_GATEWAY,
                "oauth_error",
                Some("No access token returned".to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
