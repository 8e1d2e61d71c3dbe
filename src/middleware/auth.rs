// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token authentication middleware.
//!
//! Session tokens are JWTs minted by the identity provider. They arrive in
//! the `__session` cookie or as a bearer token.

use crate::config::SessionKey;
use crate::error::AppError;
use crate::models::{Session, UserMetadata};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie holding the session token.
pub const SESSION_COOKIE: &str = "__session";

pub const SIGN_IN_PATH: &str = "/sign-in";

/// Session token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (external user id)
    pub sub: String,
    /// Identity-provider session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Metadata bag snapshot at mint time
    #[serde(default, rename = "unsafeMetadata")]
    pub unsafe_metadata: UserMetadata,
}

/// Verifies session tokens against the configured key.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(key: &SessionKey) -> Result<Self, jsonwebtoken::errors::Error> {
        let (key, algorithm) = match key {
            SessionKey::Secret(secret) => (DecodingKey::from_secret(secret), Algorithm::HS256),
            SessionKey::RsaPem(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
        };
        Ok(Self {
            key,
            validation: Validation::new(algorithm),
        })
    }

    /// Session for a valid token, `None` otherwise.
    pub fn verify(&self, token: &str) -> Option<Session> {
        let data = match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                return None;
            }
        };

        let claims = data.claims;
        if claims.sub.is_empty() {
            return None;
        }
        Some(Session {
            user_id: claims.sub,
            session_id: claims.sid,
            metadata: claims.unsafe_metadata,
        })
    }
}

/// Token from the session cookie, else the bearer header.
fn session_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// JSON 401 for API calls, sign-in redirect for pages.
pub fn unauthenticated_response(path: &str) -> Response {
    if path.starts_with("/api/") {
        return AppError::Unauthenticated.into_response();
    }
    let target = format!("{}?redirect_url={}", SIGN_IN_PATH, urlencoding::encode(path));
    Redirect::to(&target).into_response()
}

/// Middleware that requires a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = session_token(&jar, &request).and_then(|t| state.session_verifier.verify(&t));

    let Some(session) = session else {
        return unauthenticated_response(request.uri().path());
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Cookie carrying a freshly minted session token.
pub fn session_cookie(token: String, frontend_url: &str) -> Cookie<'static> {
    let secure = !(frontend_url.starts_with("http://localhost")
        || frontend_url.starts_with("http://127.0.0.1"));

    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Mint an HS256 session token (local development and tests).
pub fn create_session_token(
    user_id: &str,
    session_id: Option<&str>,
    metadata: &UserMetadata,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: user_id.to_string(),
        sid: session_id.map(str::to_string),
        iat: now,
        exp: now + 60 * 60,
        unsafe_metadata: metadata.clone(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
