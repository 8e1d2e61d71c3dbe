// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Request field name (snake_case, as submitted)
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure talking to an external collaborator (CMS, identity provider, image host).
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(err.to_string())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Please fill in the following required fields: {}", join_fields(.0))]
    ValidationFailed(Vec<FieldViolation>),

    #[error("Failed to look up user record: {0}")]
    MirrorLookupFailed(String),

    #[error("Failed to write user record: {0}")]
    MirrorWriteFailed(String),

    #[error("Failed to upload image: {0}")]
    UploadFailed(String),

    #[error("CMS rejected the write (HTTP {status})")]
    CmsWriteFailed { status: u16, body: String },

    #[error("This action requires additional privileges")]
    NotPrivileged,

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Upstream network error: {0}")]
    Network(String),

    #[error("Identity provider error: {0}")]
    IdentityFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn join_fields(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    /// Transport failures keep their own kind; anything else goes through `other`.
    fn from_upstream(err: UpstreamError, other: impl FnOnce(UpstreamError) -> AppError) -> Self {
        match err {
            UpstreamError::Timeout(msg) => AppError::Timeout(msg),
            UpstreamError::Network(msg) => AppError::Network(msg),
            err => other(err),
        }
    }

    /// Failure reading the users collection.
    pub fn mirror_lookup(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| AppError::MirrorLookupFailed(e.to_string()))
    }

    /// Failure creating or updating a user record.
    pub fn mirror_write(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| AppError::MirrorWriteFailed(e.to_string()))
    }

    /// Failure uploading an image.
    pub fn upload(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| AppError::UploadFailed(e.to_string()))
    }

    /// Failure creating or updating an event; upstream status and body are kept.
    pub fn cms_write(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| match e {
            UpstreamError::Status { status, body } => AppError::CmsWriteFailed { status, body },
            other => AppError::Internal(anyhow::anyhow!("CMS write: {}", other)),
        })
    }

    /// Failure reading from the CMS outside the users collection.
    pub fn cms_read(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| match e {
            UpstreamError::Status { status: 404, body } => AppError::NotFound(body),
            other => AppError::Internal(anyhow::anyhow!("CMS read: {}", other)),
        })
    }

    /// Failure talking to the identity provider.
    pub fn identity(err: UpstreamError) -> Self {
        Self::from_upstream(err, |e| match e {
            UpstreamError::Status { status: 401, .. } => AppError::Unauthenticated,
            other => AppError::IdentityFailed(other.to_string()),
        })
    }

    /// Machine-checkable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::MirrorLookupFailed(_) => "mirror_lookup_failed",
            AppError::MirrorWriteFailed(_) => "mirror_write_failed",
            AppError::UploadFailed(_) => "upload_failed",
            AppError::CmsWriteFailed { .. } => "cms_write_failed",
            AppError::NotPrivileged => "not_privileged",
            AppError::Timeout(_) => "timeout",
            AppError::Network(_) => "network_error",
            AppError::IdentityFailed(_) => "identity_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::ValidationFailed(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MirrorLookupFailed(_)
            | AppError::MirrorWriteFailed(_)
            | AppError::UploadFailed(_)
            | AppError::Network(_)
            | AppError::IdentityFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::CmsWriteFailed { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::NotPrivileged => StatusCode::FORBIDDEN,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldViolation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse {
            success: false,
            error: self.kind(),
            message: self.to_string(),
            details: None,
            fields: None,
            upstream_status: None,
        };

        match self {
            AppError::ValidationFailed(violations) => body.fields = Some(violations),
            AppError::CmsWriteFailed { status, body: upstream } => {
                tracing::warn!(status, body = %upstream, "CMS write rejected");
                body.upstream_status = Some(status);
                body.details = Some(upstream);
            }
            AppError::NotFound(msg) | AppError::BadRequest(msg) => body.details = Some(msg),
            AppError::MirrorLookupFailed(ref msg)
            | AppError::MirrorWriteFailed(ref msg)
            | AppError::UploadFailed(ref msg)
            | AppError::IdentityFailed(ref msg)
            | AppError::Timeout(ref msg)
            | AppError::Network(ref msg) => {
                tracing::error!(kind = body.error, error = %msg, "Upstream failure");
            }
            AppError::Internal(ref err) => {
                tracing::error!(error = %err, "Internal server error");
                body.message = "Internal server error".to_string();
            }
            AppError::Unauthenticated | AppError::NotPrivileged => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
