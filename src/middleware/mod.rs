// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, onboarding guard, security headers).

pub mod auth;
pub mod onboarding;
pub mod security;

pub use auth::{require_auth, SessionVerifier};
pub use onboarding::require_onboarded;
