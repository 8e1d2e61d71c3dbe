// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider backend API client (Clerk).
//!
//! The identity provider is the source of truth for who is signed in. This
//! client reads profiles, writes the metadata bag, and mints a fresh session
//! token so claims reflect a metadata write immediately.

use crate::error::UpstreamError;
use crate::models::user::{IdentityUser, IdentityUserPayload, UserMetadata};
use crate::upstream::{check_response_json, http_client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operations on the identity provider used by the application.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current profile and metadata bag for a user.
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, UpstreamError>;

    /// Merge `patch` into the user's metadata bag; returns the updated user.
    async fn update_metadata(
        &self,
        user_id: &str,
        patch: &UserMetadata,
    ) -> Result<IdentityUser, UpstreamError>;

    /// Mint a new session token carrying current claims.
    async fn refresh_session(&self, session_id: &str) -> Result<String, UpstreamError>;
}

/// Clerk backend API client.
#[derive(Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct MetadataPatch<'a> {
    unsafe_metadata: &'a UserMetadata,
}

#[derive(Deserialize)]
struct SessionTokenResponse {
    jwt: String,
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, UpstreamError> {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(user_id));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let raw: IdentityUserPayload = check_response_json(response).await?;
        Ok(raw.into())
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        patch: &UserMetadata,
    ) -> Result<IdentityUser, UpstreamError> {
        let url = format!(
            "{}/users/{}/metadata",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .json(&MetadataPatch {
                unsafe_metadata: patch,
            })
            .send()
            .await?;

        let raw: IdentityUserPayload = check_response_json(response).await?;
        tracing::info!(user_id, "Identity metadata updated");
        Ok(raw.into())
    }

    async fn refresh_session(&self, session_id: &str) -> Result<String, UpstreamError> {
        let url = format!(
            "{}/sessions/{}/tokens",
            self.base_url,
            urlencoding::encode(session_id)
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let token: SessionTokenResponse = check_response_json(response).await?;
        Ok(token.jwt)
    }
}
