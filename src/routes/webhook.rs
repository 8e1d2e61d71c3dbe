// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for identity-provider user events.

use crate::error::{AppError, Result};
use crate::models::user::IdentityUserPayload;
use crate::models::IdentityUser;
use crate::services::svix;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhooks/identity", post(handle_event))
}

/// Identity-provider webhook envelope.
#[derive(Deserialize, Debug)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Serialize, Debug)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_id: Option<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handle a signed delivery (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>> {
    let (Some(msg_id), Some(timestamp), Some(signatures)) = (
        header(&headers, "svix-id"),
        header(&headers, "svix-timestamp"),
        header(&headers, "svix-signature"),
    ) else {
        tracing::warn!("Webhook rejected: missing signature headers");
        return Err(AppError::BadRequest("Missing svix headers".to_string()));
    };

    if let Err(e) = svix::verify(
        &state.config.webhook_signing_secret,
        msg_id,
        timestamp,
        signatures,
        &body,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(msg_id, error = %e, "Security Alert: Webhook signature verification failed");
        return Err(AppError::BadRequest("Verification failed".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    tracing::info!(msg_id, event_type = %event.event_type, "Webhook event received");

    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let payload: IdentityUserPayload = serde_json::from_value(event.data)
                .map_err(|e| AppError::BadRequest(format!("Invalid user payload: {}", e)))?;
            let user = IdentityUser::from(payload);

            let outcome = state.mirror_sync.ensure_mirror(&user).await?;
            if !outcome.already_exists {
                state.mirror_sync.publish(&outcome.mirror_id).await;
            }

            Ok(Json(WebhookResponse {
                success: true,
                mirror_id: Some(outcome.mirror_id),
            }))
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring webhook event");
            Ok(Json(WebhookResponse {
                success: true,
                mirror_id: None,
            }))
        }
    }
}
