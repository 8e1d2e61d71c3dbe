// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in, onboarded users.

use crate::error::{AppError, Result};
use crate::models::{ReferenceItem, Session};
use crate::services::ReferenceKind;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require a session and completed onboarding).
/// The middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/api/sync-user", post(sync_user))
        .route("/api/current-user", get(current_user))
        .route("/api/categories", get(categories))
        .route("/api/communities", get(communities))
        .route("/api/locations", get(locations))
}

// ─── Home ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HomeResponse {
    pub user_id: String,
    pub display_name: Option<String>,
}

/// Landing page data; reaching it means onboarding is done.
async fn home(session: Session) -> Json<HomeResponse> {
    Json(HomeResponse {
        display_name: session.metadata.display_name().map(str::to_string),
        user_id: session.user_id,
    })
}

// ─── Mirror Sync ─────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncUserResponse {
    pub success: bool,
    pub already_exists: bool,
    pub mirror_id: String,
    pub message: String,
}

/// Ensure the caller has a mirror record.
async fn sync_user(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<SyncUserResponse>> {
    let outcome = state.mirror_sync.sync_current_user(&session).await?;

    let message = if outcome.already_exists {
        "User already synced"
    } else {
        "User synced"
    };

    Ok(Json(SyncUserResponse {
        success: true,
        already_exists: outcome.already_exists,
        mirror_id: outcome.mirror_id,
        message: message.to_string(),
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentUserResponse {
    pub mirror_id: String,
    pub external_user_id: String,
    pub name: String,
    pub email: String,
}

/// The caller's mirror record, without creating one.
async fn current_user(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<CurrentUserResponse>> {
    let mirror = state
        .mirror_sync
        .find_mirror(&session.user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("User record not found. Refresh the page to sync.".to_string())
        })?;

    Ok(Json(CurrentUserResponse {
        mirror_id: mirror.mirror_id,
        external_user_id: mirror.external_user_id,
        name: mirror.display_name,
        email: mirror.email,
    }))
}

// ─── Reference Lists ─────────────────────────────────────────

#[derive(Serialize)]
pub struct ReferenceListResponse {
    pub items: Vec<ReferenceItem>,
}

async fn list(state: &AppState, kind: ReferenceKind) -> Result<Json<ReferenceListResponse>> {
    let items = state.event_gate.list_references(kind).await?;
    Ok(Json(ReferenceListResponse { items }))
}

async fn categories(State(state): State<Arc<AppState>>) -> Result<Json<ReferenceListResponse>> {
    list(&state, ReferenceKind::Categories).await
}

async fn communities(State(state): State<Arc<AppState>>) -> Result<Json<ReferenceListResponse>> {
    list(&state, ReferenceKind::Communities).await
}

async fn locations(State(state): State<Arc<AppState>>) -> Result<Json<ReferenceListResponse>> {
    list(&state, ReferenceKind::Locations).await
}
