use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the server composer and its lifecycle.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not be bound (address in use, permission denied, ...).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The transport failed while serving.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// In-flight requests did not finish within the grace period.
    #[error(
        "graceful shutdown timed out after {timeout:?} with {} request(s) outstanding: {outstanding:?}",
        .outstanding.len()
    )]
    DrainTimeout {
        timeout: Duration,
        outstanding: Vec<String>,
    },

    /// A resource declares a method the router cannot dispatch on.
    #[error("unsupported method {method} for {path}")]
    UnsupportedMethod { method: Method, path: String },

    /// A resource path the router would reject.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The path would overlap a wildcard route that is already mounted.
    #[error("route {path} conflicts with {existing}")]
    ConflictingRoute { path: String, existing: String },

    /// The same method and path was already mounted by another service.
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },
}

/// Client-facing errors returned by request handlers.
///
/// Rendered as `{"error": "<message>"}` with the matching status code.
/// Logged at debug level only.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        tracing::debug!("Client error {}: {}", status, self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
