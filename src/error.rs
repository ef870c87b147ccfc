//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure the core can report and implements
//! Axum's `IntoResponse` so handlers can return it directly.
//!
//! Error mappings:
//! - `NotFound` → 404
//! - `Validation` → 400
//! - `Unauthorized` → 403
//! - `Upstream` → 500 (sanitized body, detail logged)
//! - `Delivery` → 502 (sanitized body, comment id included, detail logged)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// No refs, a path without history, or a missing commit.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed anchor or empty content. Nothing was persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The repository reader or a backing store failed unexpectedly.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Notification dispatch failed after the comment was persisted.
    #[error("Notification delivery failed for comment {comment_id}: {message}")]
    Delivery { comment_id: i64, message: String },

    /// Same response whether or not the target exists.
    #[error("Operation not permitted")]
    Unauthorized,
}

impl AppError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        AppError::Upstream(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<git2::Error> for AppError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => AppError::NotFound(err.message().to_string()),
            _ => AppError::Upstream(err.message().to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Upstream(format!("reader task failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("Not found: {}", what) }),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Unauthorized => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Operation not permitted" }),
            ),
            AppError::Upstream(detail) => {
                tracing::error!("upstream failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Delivery { comment_id, message } => {
                tracing::error!("notification delivery failed for comment {}: {}", comment_id, message);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "Comment saved, notification may be delayed",
                        "comment_id": comment_id,
                    }),
                )
            }
        };

        let (status, payload) = body;
        (status, Json(payload)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
