// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared plumbing for HTTP clients of external collaborators.

use crate::error::UpstreamError;
use serde::Deserialize;
use std::time::Duration;

/// HTTP client whose every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::Network(format!("HTTP client init failed: {}", e)))
}

/// Check response status and return error if not successful.
pub async fn check_response(response: reqwest::Response) -> Result<(), UpstreamError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(status_error(response).await)
}

/// Check response and parse JSON body.
pub async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, UpstreamError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| UpstreamError::Decode(format!("JSON parse error: {}", e)))
}

async fn status_error(response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    // Rate limits are not retried here; callers surface them as-is
    if status == 429 {
        tracing::warn!(path = %url, "Upstream rate limit hit (429)");
    }

    UpstreamError::Status { status, body }
}
