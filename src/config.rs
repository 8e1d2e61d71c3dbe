// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (CMS token, identity provider key, webhook secret) are injected
//! as environment variables by the deployment and read once at startup.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Collection ids in the CMS site.
#[derive(Debug, Clone)]
pub struct CollectionIds {
    pub events: String,
    pub categories: String,
    pub communities: String,
    pub locations: String,
    pub users: String,
}

/// Key material used to verify session tokens issued by the identity provider.
#[derive(Debug, Clone)]
pub enum SessionKey {
    /// Shared secret (HS256), used for local development and tests.
    Secret(Vec<u8>),
    /// PEM-encoded RSA public key (RS256), as published by the identity provider.
    RsaPem(String),
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// CMS REST API base URL
    pub cms_api_url: String,
    /// CMS site id (asset uploads are site-scoped)
    pub cms_site_id: String,
    /// CMS collection ids
    pub collections: CollectionIds,
    /// Identity provider backend API base URL
    pub identity_api_url: String,
    /// External user ids allowed to write to the live target
    pub admin_user_ids: HashSet<String>,
    /// Bound applied to every call to an external collaborator
    pub upstream_timeout: Duration,
    /// How long a freshly created mirror id is remembered for dedup
    pub mirror_dedup_ttl: Duration,

    // --- Secrets ---
    /// CMS API bearer token
    pub cms_api_token: String,
    /// Identity provider backend secret key
    pub identity_secret_key: String,
    /// Session token verification key
    pub session_key: SessionKey,
    /// Identity webhook signing secret (`whsec_...`)
    pub webhook_signing_secret: String,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            cms_api_url: "http://localhost:9999/v2".to_string(),
            cms_site_id: "test-site".to_string(),
            collections: CollectionIds {
                events: "events-col".to_string(),
                categories: "categories-col".to_string(),
                communities: "communities-col".to_string(),
                locations: "locations-col".to_string(),
                users: "users-col".to_string(),
            },
            identity_api_url: "http://localhost:9998/v1".to_string(),
            admin_user_ids: HashSet::from(["user_admin".to_string()]),
            upstream_timeout: Duration::from_secs(2),
            mirror_dedup_ttl: Duration::from_secs(120),
            cms_api_token: "test_cms_token".to_string(),
            identity_secret_key: "sk_test_identity".to_string(),
            session_key: SessionKey::Secret(b"test_session_key_32_bytes_min!!".to_vec()),
            // base64("test_webhook_secret_bytes")
            webhook_signing_secret: "whsec_dGVzdF93ZWJob29rX3NlY3JldF9ieXRlcw==".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let session_key = match env::var("SESSION_PUBLIC_KEY_PEM") {
            Ok(pem) if !pem.trim().is_empty() => SessionKey::RsaPem(pem),
            _ => SessionKey::Secret(required("SESSION_SIGNING_KEY")?.into_bytes()),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cms_api_url: env::var("CMS_API_URL")
                .unwrap_or_else(|_| "https://api.webflow.com/v2".to_string()),
            cms_site_id: required("CMS_SITE_ID")?,
            collections: CollectionIds {
                events: required("EVENTS_COLLECTION_ID")?,
                categories: required("CATEGORIES_COLLECTION_ID")?,
                communities: required("COMMUNITIES_COLLECTION_ID")?,
                locations: required("LOCATIONS_COLLECTION_ID")?,
                users: required("USERS_COLLECTION_ID")?,
            },
            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com/v1".to_string()),
            admin_user_ids: parse_id_list(&env::var("ADMIN_USER_IDS").unwrap_or_default()),
            upstream_timeout: Duration::from_secs(seconds("UPSTREAM_TIMEOUT_SECS", 10)?),
            mirror_dedup_ttl: Duration::from_secs(seconds("MIRROR_DEDUP_TTL_SECS", 120)?),

            cms_api_token: required("CMS_API_TOKEN")?,
            identity_secret_key: required("IDENTITY_SECRET_KEY")?,
            session_key,
            webhook_signing_secret: required("WEBHOOK_SIGNING_SECRET")?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn seconds(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated id list, ignoring blanks.
pub fn parse_id_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
