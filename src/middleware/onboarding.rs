// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding guard. Runs after [`super::auth::require_auth`].

use super::auth::unauthenticated_response;
use crate::models::Session;
use crate::services::onboarding::{decide, GateDecision, RouteClass, HOME_PATH, ONBOARDING_PATH};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Send users who have not finished onboarding to the onboarding route,
/// and users who have finished it away from there.
pub async fn require_onboarded(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let route = RouteClass::of(&path);

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return match decide(route, None) {
            GateDecision::Allow => next.run(request).await,
            _ => unauthenticated_response(&path),
        };
    };

    let current = match state.onboarding.current_state(&session).await {
        Ok(current) => current,
        Err(e) => return e.into_response(),
    };

    match decide(route, Some(current)) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::RedirectToSignIn => unauthenticated_response(&path),
        GateDecision::RedirectToOnboarding => {
            tracing::debug!(user_id = %session.user_id, path = %path, "Onboarding required");
            Redirect::to(ONBOARDING_PATH).into_response()
        }
        GateDecision::RedirectHome => {
            tracing::debug!(user_id = %session.user_id, "Already onboarded");
            Redirect::to(HOME_PATH).into_response()
        }
    }
}
