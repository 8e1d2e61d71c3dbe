// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated session, as asserted by an identity-provider token.

use super::user::UserMetadata;
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// External user id (token `sub`)
    pub user_id: String,
    /// Identity-provider session id (token `sid`), needed to refresh claims
    pub session_id: Option<String>,
    /// Metadata bag snapshot taken when the token was minted
    pub metadata: UserMetadata,
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
