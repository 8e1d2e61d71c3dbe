// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding state machine.
//!
//! Two states: `New` until the user records a display name, then
//! `Complete`. The state lives in the identity provider's metadata bag,
//! so a claims snapshot taken before the completing write can be stale.
//! Completion never reverts, which means only a `New` snapshot needs
//! re-checking against the provider.

use crate::error::{AppError, FieldViolation};
use crate::models::{IdentityUser, Session, UserMetadata};
use crate::services::identity::IdentityProvider;
use crate::services::mirror::MirrorSyncService;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest display name accepted.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Where the app lands after onboarding.
pub const HOME_PATH: &str = "/";

pub const ONBOARDING_PATH: &str = "/onboarding";

/// How long a completion confirmed by the provider is remembered.
pub const COMPLETION_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum OnboardingState {
    New,
    Complete,
}

impl OnboardingState {
    pub fn from_metadata(metadata: &UserMetadata) -> Self {
        if metadata.is_onboarding_complete() {
            OnboardingState::Complete
        } else {
            OnboardingState::New
        }
    }
}

/// How the onboarding guard treats a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Health, webhooks, sign-in and sign-up
    Public,
    /// The onboarding route itself
    Onboarding,
    /// Everything else
    Protected,
}

impl RouteClass {
    pub fn of(path: &str) -> Self {
        let under = |prefix: &str| path == prefix || path.starts_with(&format!("{}/", prefix));

        if under("/health") || under("/webhooks") || under("/sign-in") || under("/sign-up") {
            RouteClass::Public
        } else if under(ONBOARDING_PATH) {
            RouteClass::Onboarding
        } else {
            RouteClass::Protected
        }
    }
}

/// Outcome of the onboarding guard for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToSignIn,
    RedirectToOnboarding,
    RedirectHome,
}

/// Guard decision for a route given the caller's state (`None` = signed out).
///
/// The onboarding route never redirects to itself, and sends completed
/// users home.
pub fn decide(route: RouteClass, state: Option<OnboardingState>) -> GateDecision {
    match (route, state) {
        (RouteClass::Public, _) => GateDecision::Allow,
        (_, None) => GateDecision::RedirectToSignIn,
        (RouteClass::Onboarding, Some(OnboardingState::Complete)) => GateDecision::RedirectHome,
        (RouteClass::Onboarding, Some(OnboardingState::New)) => GateDecision::Allow,
        (RouteClass::Protected, Some(OnboardingState::New)) => GateDecision::RedirectToOnboarding,
        (RouteClass::Protected, Some(OnboardingState::Complete)) => GateDecision::Allow,
    }
}

/// Trimmed display name, or the violation to report.
pub fn normalize_display_name(raw: &str) -> Result<String, FieldViolation> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldViolation::new("display_name", "Display name is required"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(FieldViolation::new(
            "display_name",
            format!(
                "Display name must be at most {} characters",
                MAX_DISPLAY_NAME_CHARS
            ),
        ));
    }
    Ok(name.to_string())
}

/// Result of completing onboarding.
#[derive(Debug, Clone)]
pub struct CompletedOnboarding {
    /// Freshly minted session token carrying the new claims, when the
    /// session could be refreshed
    pub session_token: Option<String>,
    /// Metadata bag as re-read after the write
    pub metadata: UserMetadata,
    pub redirect_to: &'static str,
}

#[derive(Clone)]
pub struct OnboardingService {
    identity: Arc<dyn IdentityProvider>,
    mirror: MirrorSyncService,
    /// Users the provider has confirmed as complete, keyed by external id
    completed: Arc<DashMap<String, Instant>>,
}

impl OnboardingService {
    pub fn new(identity: Arc<dyn IdentityProvider>, mirror: MirrorSyncService) -> Self {
        Self {
            identity,
            mirror,
            completed: Arc::new(DashMap::new()),
        }
    }

    fn remember_complete(&self, user_id: &str) {
        self.completed
            .retain(|_, confirmed_at| confirmed_at.elapsed() < COMPLETION_CACHE_TTL);
        self.completed.insert(user_id.to_string(), Instant::now());
    }

    fn recently_confirmed(&self, user_id: &str) -> bool {
        self.completed
            .get(user_id)
            .is_some_and(|confirmed_at| confirmed_at.elapsed() < COMPLETION_CACHE_TTL)
    }

    /// Current state, re-fetching from the provider when claims say `New`.
    ///
    /// Tokens without the metadata claim always read as `New`, so a
    /// confirmed completion is remembered instead of re-fetched each request.
    pub async fn current_state(&self, session: &Session) -> Result<OnboardingState, AppError> {
        if OnboardingState::from_metadata(&session.metadata) == OnboardingState::Complete
            || self.recently_confirmed(&session.user_id)
        {
            return Ok(OnboardingState::Complete);
        }

        let user = self
            .identity
            .get_user(&session.user_id)
            .await
            .map_err(AppError::identity)?;
        let state = OnboardingState::from_metadata(&user.metadata);

        if state == OnboardingState::Complete {
            tracing::debug!(user_id = %session.user_id, "Session claims were stale");
            self.remember_complete(&session.user_id);
        }
        Ok(state)
    }

    /// Fresh profile for the onboarding page.
    pub async fn current_user(&self, session: &Session) -> Result<IdentityUser, AppError> {
        self.identity
            .get_user(&session.user_id)
            .await
            .map_err(AppError::identity)
    }

    /// `New -> Complete`: persist, refresh claims, verify, then hand back the redirect.
    pub async fn complete(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<CompletedOnboarding, AppError> {
        let display_name =
            normalize_display_name(display_name).map_err(|v| AppError::ValidationFailed(vec![v]))?;

        let patch = UserMetadata {
            display_name: Some(display_name.clone()),
            onboarding_complete: Some(true),
            ..Default::default()
        };
        self.identity
            .update_metadata(&session.user_id, &patch)
            .await
            .map_err(AppError::identity)?;

        let session_token = match &session.session_id {
            Some(sid) => Some(
                self.identity
                    .refresh_session(sid)
                    .await
                    .map_err(AppError::identity)?,
            ),
            None => {
                tracing::warn!(user_id = %session.user_id, "No session id, claims not refreshed");
                None
            }
        };

        // Read back before redirecting; never trust the pre-write snapshot
        let user = self
            .identity
            .get_user(&session.user_id)
            .await
            .map_err(AppError::identity)?;
        if !user.metadata.is_onboarding_complete() {
            return Err(AppError::IdentityFailed(
                "Onboarding state not visible after write".to_string(),
            ));
        }
        self.remember_complete(&session.user_id);

        if let Err(e) = self.mirror.ensure_mirror(&user).await {
            tracing::warn!(
                user_id = %session.user_id,
                error = %e,
                "Mirror sync after onboarding failed"
            );
        }

        tracing::info!(user_id = %session.user_id, display_name = %display_name, "Onboarding complete");

        Ok(CompletedOnboarding {
            session_token,
            metadata: user.metadata,
            redirect_to: HOME_PATH,
        })
    }
}
