// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding route. Only reachable while onboarding is incomplete.

use crate::error::Result;
use crate::middleware::auth::session_cookie;
use crate::models::Session;
use crate::services::OnboardingState;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/onboarding", get(status).post(complete))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingStatusResponse {
    pub state: OnboardingState,
    /// Suggested display name (the user's first name)
    pub suggested_name: Option<String>,
}

async fn status(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<OnboardingStatusResponse>> {
    let user = state.onboarding.current_user(&session).await?;
    Ok(Json(OnboardingStatusResponse {
        state: OnboardingState::from_metadata(&user.metadata),
        suggested_name: user.first_name.filter(|n| !n.trim().is_empty()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteOnboardingRequest {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompleteOnboardingResponse {
    pub success: bool,
    pub display_name: Option<String>,
    pub redirect_to: String,
}

/// Record the display name, then hand back a refreshed session cookie.
async fn complete(
    State(state): State<Arc<AppState>>,
    session: Session,
    jar: CookieJar,
    Json(req): Json<CompleteOnboardingRequest>,
) -> Result<(CookieJar, Json<CompleteOnboardingResponse>)> {
    let done = state
        .onboarding
        .complete(&session, &req.display_name)
        .await?;

    let jar = match done.session_token {
        Some(token) => jar.add(session_cookie(token, &state.config.frontend_url)),
        None => jar,
    };

    Ok((
        jar,
        Json(CompleteOnboardingResponse {
            success: true,
            display_name: done.metadata.display_name().map(str::to_string),
            redirect_to: done.redirect_to.to_string(),
        }),
    ))
}
