// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Event Console: keeps a CMS in step with an external identity provider.
//!
//! This crate provides the backend API that mirrors signed-in users into the
//! CMS users collection, gates event writes on ownership and privilege, and
//! drives first-run onboarding.

pub mod cms;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod upstream;

use cms::{CmsApi, WebflowClient};
use config::Config;
use middleware::SessionVerifier;
use services::{
    ClerkClient, EventGate, IdentityProvider, ImageHost, MirrorSyncService, OnboardingService,
    WebflowAssetHost,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session_verifier: SessionVerifier,
    pub mirror_sync: MirrorSyncService,
    pub event_gate: EventGate,
    pub onboarding: OnboardingService,
}

impl AppState {
    /// Wire services around the given collaborators.
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        cms: Arc<dyn CmsApi>,
        images: Arc<dyn ImageHost>,
    ) -> anyhow::Result<Self> {
        let session_verifier = SessionVerifier::new(&config.session_key)?;

        let mirror_sync = MirrorSyncService::new(
            identity.clone(),
            cms.clone(),
            &config.collections.users,
            config.mirror_dedup_ttl,
        );
        let event_gate = EventGate::new(
            cms,
            images,
            mirror_sync.clone(),
            config.collections.clone(),
            config.admin_user_ids.clone(),
        );
        let onboarding = OnboardingService::new(identity, mirror_sync.clone());

        Ok(Self {
            config,
            session_verifier,
            mirror_sync,
            event_gate,
            onboarding,
        })
    }

    /// State backed by the real identity provider, CMS and asset host.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let timeout = config.upstream_timeout;

        let webflow = WebflowClient::new(&config.cms_api_url, &config.cms_api_token, timeout)?;
        let images = WebflowAssetHost::new(webflow.clone(), &config.cms_site_id);
        let identity = ClerkClient::new(
            &config.identity_api_url,
            &config.identity_secret_key,
            timeout,
        )?;

        Self::new(
            config,
            Arc::new(identity),
            Arc::new(webflow),
            Arc::new(images),
        )
    }
}
