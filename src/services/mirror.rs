// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity mirror synchronizer.
//!
//! Keeps exactly one record per external user id in the CMS users
//! collection and keeps its display fields current. The CMS has no unique
//! constraint, so the lookup-then-create sequence is serialized per
//! external user id inside this process:
//! 1. Acquire the per-user lock
//! 2. Look the record up through the [`MirrorIndex`]
//! 3. If found, write only the display fields that changed
//! 4. If not found, consult the recently-created cache (covers a listing
//!    that lags behind our own create), else create the record
//!
//! Serialization is process-local. Several instances syncing the same new
//! user at the same moment can still race.

use crate::cms::{CmsApi, CmsItem, ItemWrite, WriteTarget};
use crate::cms::fields;
use crate::error::{AppError, UpstreamError};
use crate::models::{IdentityUser, MirrorUser, ResolvedProfile, Session};
use crate::services::identity::IdentityProvider;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Result of a sync call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub already_exists: bool,
    pub mirror_id: String,
}

/// Finds the mirror record for an external user id.
#[async_trait]
pub trait MirrorIndex: Send + Sync {
    async fn find(&self, external_user_id: &str) -> Result<Option<MirrorUser>, UpstreamError>;
}

/// Full-collection scan matching on the foreign-key field.
///
/// O(collection size) per call, and the dominant cost of a sync. The CMS
/// list endpoint offers no filter on this field.
pub struct CollectionScanIndex {
    cms: Arc<dyn CmsApi>,
    collection_id: String,
}

impl CollectionScanIndex {
    pub fn new(cms: Arc<dyn CmsApi>, collection_id: &str) -> Self {
        Self {
            cms,
            collection_id: collection_id.to_string(),
        }
    }
}

/// First item whose foreign key equals `external_user_id`.
pub fn find_in_items<'a>(items: &'a [CmsItem], external_user_id: &str) -> Option<&'a CmsItem> {
    items
        .iter()
        .find(|item| item.str_field(fields::user::EXTERNAL_ID) == Some(external_user_id))
}

#[async_trait]
impl MirrorIndex for CollectionScanIndex {
    async fn find(&self, external_user_id: &str) -> Result<Option<MirrorUser>, UpstreamError> {
        let items = self.cms.list_items(&self.collection_id).await?;
        tracing::debug!(
            scanned = items.len(),
            external_user_id,
            "Scanned users collection"
        );
        Ok(find_in_items(&items, external_user_id).and_then(MirrorUser::from_item))
    }
}

/// A mirror this process created recently, with the display fields last written to it.
#[derive(Clone)]
struct RecentMirror {
    mirror_id: String,
    profile: ResolvedProfile,
    created_at: Instant,
}

/// Shared per-user sync locks.
pub type SyncLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Identity mirror synchronizer.
#[derive(Clone)]
pub struct MirrorSyncService {
    identity: Arc<dyn IdentityProvider>,
    cms: Arc<dyn CmsApi>,
    index: Arc<dyn MirrorIndex>,
    users_collection: String,
    locks: SyncLocks,
    recent: Arc<DashMap<String, RecentMirror>>,
    dedup_ttl: Duration,
}

impl MirrorSyncService {
    /// Create a synchronizer backed by a full-collection scan.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        cms: Arc<dyn CmsApi>,
        users_collection: &str,
        dedup_ttl: Duration,
    ) -> Self {
        let index = Arc::new(CollectionScanIndex::new(cms.clone(), users_collection));
        Self {
            identity,
            cms,
            index,
            users_collection: users_collection.to_string(),
            locks: Arc::new(DashMap::new()),
            recent: Arc::new(DashMap::new()),
            dedup_ttl,
        }
    }

    /// Replace the lookup strategy.
    pub fn with_index(mut self, index: Arc<dyn MirrorIndex>) -> Self {
        self.index = index;
        self
    }

    /// Ensure the session's user has a mirror record and return its id.
    pub async fn sync_current_user(&self, session: &Session) -> Result<SyncOutcome, AppError> {
        let user = self
            .identity
            .get_user(&session.user_id)
            .await
            .map_err(AppError::identity)?;

        self.ensure_mirror(&user).await
    }

    /// Idempotent upsert of the mirror record for `user`.
    pub async fn ensure_mirror(&self, user: &IdentityUser) -> Result<SyncOutcome, AppError> {
        let profile = ResolvedProfile::from_identity(user);

        let lock = self
            .locks
            .entry(user.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.upsert_locked(&user.id, &profile).await
        };

        // Drop the lock entry once nobody else holds or waits on it
        drop(lock);
        self.locks
            .remove_if(&user.id, |_, l| Arc::strong_count(l) == 1);

        result
    }

    async fn upsert_locked(
        &self,
        external_user_id: &str,
        profile: &ResolvedProfile,
    ) -> Result<SyncOutcome, AppError> {
        let existing = self
            .index
            .find(external_user_id)
            .await
            .map_err(AppError::mirror_lookup)?;

        if let Some(mirror) = existing {
            self.recent.remove(external_user_id);
            self.update_display_fields(&mirror, profile).await?;
            return Ok(SyncOutcome {
                already_exists: true,
                mirror_id: mirror.mirror_id,
            });
        }

        if let Some(recent) = self.recent_mirror(external_user_id) {
            tracing::debug!(
                external_user_id,
                mirror_id = %recent.mirror_id,
                "Mirror not listed yet, using recently created record"
            );
            let mirror = MirrorUser::from_profile(&recent.mirror_id, external_user_id, &recent.profile);
            self.update_display_fields(&mirror, profile).await?;
            if let Some(mut entry) = self.recent.get_mut(external_user_id) {
                entry.profile = profile.clone();
            }
            return Ok(SyncOutcome {
                already_exists: true,
                mirror_id: recent.mirror_id,
            });
        }

        let item = ItemWrite {
            field_data: MirrorUser::new_field_data(external_user_id, profile),
            is_draft: Some(false),
            is_archived: None,
        };
        let created = self
            .cms
            .create_item(&self.users_collection, &item)
            .await
            .map_err(AppError::mirror_write)?;

        // Entries for users who never sync again would otherwise stay forever
        self.recent
            .retain(|_, r| r.created_at.elapsed() < self.dedup_ttl);
        self.recent.insert(
            external_user_id.to_string(),
            RecentMirror {
                mirror_id: created.id.clone(),
                profile: profile.clone(),
                created_at: Instant::now(),
            },
        );

        tracing::info!(
            external_user_id,
            mirror_id = %created.id,
            "Mirror user record created"
        );

        Ok(SyncOutcome {
            already_exists: false,
            mirror_id: created.id,
        })
    }

    async fn update_display_fields(
        &self,
        mirror: &MirrorUser,
        profile: &ResolvedProfile,
    ) -> Result<(), AppError> {
        let diff = mirror.display_diff(profile);
        if diff.is_empty() {
            tracing::debug!(mirror_id = %mirror.mirror_id, "Mirror display fields unchanged");
            return Ok(());
        }

        let changed: Vec<&str> = diff.keys().map(String::as_str).collect();
        tracing::info!(
            mirror_id = %mirror.mirror_id,
            fields = ?changed,
            "Updating mirror display fields"
        );

        let item = ItemWrite {
            field_data: diff,
            is_draft: None,
            is_archived: None,
        };
        self.cms
            .update_item(
                &self.users_collection,
                &mirror.mirror_id,
                &item,
                WriteTarget::Live,
            )
            .await
            .map_err(AppError::mirror_write)?;
        Ok(())
    }

    fn recent_mirror(&self, external_user_id: &str) -> Option<RecentMirror> {
        let entry = self.recent.get(external_user_id)?;
        if entry.created_at.elapsed() < self.dedup_ttl {
            return Some(entry.clone());
        }
        drop(entry);
        self.recent.remove(external_user_id);
        None
    }

    /// Number of recently created records still remembered for dedup.
    pub fn pending_count(&self) -> usize {
        self.recent.len()
    }

    /// Read-only lookup of an existing mirror record.
    pub async fn find_mirror(&self, external_user_id: &str) -> Result<Option<MirrorUser>, AppError> {
        self.index
            .find(external_user_id)
            .await
            .map_err(AppError::mirror_lookup)
    }

    /// Read-only lookup of a mirror id, including records this process just created.
    pub async fn find_mirror_id(&self, external_user_id: &str) -> Result<Option<String>, AppError> {
        if let Some(mirror) = self.find_mirror(external_user_id).await? {
            return Ok(Some(mirror.mirror_id));
        }
        Ok(self.recent_mirror(external_user_id).map(|r| r.mirror_id))
    }

    /// Publish a freshly created mirror record (best effort).
    pub async fn publish(&self, mirror_id: &str) {
        match self
            .cms
            .publish_items(&self.users_collection, &[mirror_id.to_string()])
            .await
        {
            Ok(()) => tracing::info!(mirror_id, "Mirror user record published"),
            Err(e) => tracing::warn!(
                error = %e,
                mirror_id,
                "Could not publish mirror user record (may already be live)"
            ),
        }
    }
}
