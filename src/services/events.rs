// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event ownership gate.
//!
//! Every event write goes through here. The gate:
//! - Binds the organiser to the caller's mirror id at creation
//! - Drops any organiser from update payloads
//! - Creates events as draft + archived, whoever the caller is
//! - Only lets privileged callers reach the live write target
//! - Uploads a pending thumbnail before touching the CMS

use crate::cms::{fields, CmsApi, ItemWrite, WriteTarget};
use crate::config::CollectionIds;
use crate::error::AppError;
use crate::models::{
    CreateEventRequest, EventRecord, ReferenceItem, Session, Thumbnail, UpdateEventRequest,
    UpdateMode,
};
use crate::services::images::{ImageHost, ImageUpload};
use crate::services::mirror::MirrorSyncService;
use std::collections::HashSet;
use std::sync::Arc;

/// Read-only lookup collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Categories,
    Communities,
    Locations,
}

/// Pick the write target for an update.
///
/// Live only when the caller is privileged and asked for live. A
/// non-privileged live request is downgraded, not rejected.
pub fn resolve_target(privileged: bool, requested: UpdateMode) -> WriteTarget {
    match (privileged, requested) {
        (true, UpdateMode::Live) => WriteTarget::Live,
        _ => WriteTarget::Staging,
    }
}

/// Event ownership gate.
#[derive(Clone)]
pub struct EventGate {
    cms: Arc<dyn CmsApi>,
    images: Arc<dyn ImageHost>,
    mirror: MirrorSyncService,
    collections: CollectionIds,
    privileged: Arc<HashSet<String>>,
}

impl EventGate {
    pub fn new(
        cms: Arc<dyn CmsApi>,
        images: Arc<dyn ImageHost>,
        mirror: MirrorSyncService,
        collections: CollectionIds,
        privileged: HashSet<String>,
    ) -> Self {
        Self {
            cms,
            images,
            mirror,
            collections,
            privileged: Arc::new(privileged),
        }
    }

    fn is_privileged(&self, user_id: &str) -> bool {
        self.privileged.contains(user_id)
    }

    /// Create an event owned by the caller.
    pub async fn create_event(
        &self,
        session: &Session,
        req: CreateEventRequest,
    ) -> Result<EventRecord, AppError> {
        let violations = req.violations();
        if !violations.is_empty() {
            return Err(AppError::ValidationFailed(violations));
        }

        // Decode before any external call so bad input never syncs or uploads
        let pending = match &req.pending_image {
            Some(image) => Some(ImageUpload {
                file_name: image.file_name.clone(),
                content_type: image.content_type.clone(),
                bytes: image.bytes()?,
            }),
            None => None,
        };

        let mirror = self.mirror.sync_current_user(session).await?;

        let thumbnail = match pending {
            Some(upload) => Thumbnail::Uploaded(
                self.images.upload(upload).await.map_err(AppError::upload)?,
            ),
            None => req
                .thumbnail
                .clone()
                .ok_or_else(|| AppError::BadRequest("Thumbnail is required".to_string()))?,
        };

        if let Some(supplied) = req.organiser.as_deref() {
            if supplied != mirror.mirror_id {
                tracing::warn!(
                    user_id = %session.user_id,
                    supplied,
                    "Ignoring caller-supplied organiser"
                );
            }
        }

        let item = ItemWrite {
            field_data: req.to_field_data(&thumbnail, &mirror.mirror_id),
            is_draft: Some(true),
            is_archived: Some(true),
        };
        let created = self
            .cms
            .create_item(&self.collections.events, &item)
            .await
            .map_err(AppError::cms_write)?;

        tracing::info!(
            user_id = %session.user_id,
            item_id = %created.id,
            mirror_id = %mirror.mirror_id,
            "Event created"
        );

        Ok(EventRecord::from(&created))
    }

    /// Update an event on the staging or (privileged only) live target.
    pub async fn update_event(
        &self,
        session: &Session,
        item_id: &str,
        req: UpdateEventRequest,
    ) -> Result<EventRecord, AppError> {
        let violations = req.fields.violations();
        if !violations.is_empty() {
            return Err(AppError::ValidationFailed(violations));
        }

        let privileged = self.is_privileged(&session.user_id);
        let requested = req.update_mode.unwrap_or_default();
        let target = resolve_target(privileged, requested);

        if requested == UpdateMode::Live && target == WriteTarget::Staging {
            tracing::warn!(
                user_id = %session.user_id,
                item_id,
                "Live update requested without privilege, writing to staging"
            );
        }
        if req.fields.organiser.is_some() {
            tracing::debug!(item_id, "Dropping organiser from update payload");
        }

        if !privileged {
            self.check_owner(session, item_id).await?;
        }

        let item = ItemWrite {
            field_data: req.fields.to_field_data(),
            is_draft: match target {
                WriteTarget::Live => Some(false),
                WriteTarget::Staging => None,
            },
            is_archived: req.is_archived,
        };
        let updated = self
            .cms
            .update_item(&self.collections.events, item_id, &item, target)
            .await
            .map_err(AppError::cms_write)?;

        tracing::info!(
            user_id = %session.user_id,
            item_id,
            target = ?target,
            "Event updated"
        );

        Ok(EventRecord::from(&updated))
    }

    /// Non-privileged callers may only touch their own events.
    async fn check_owner(&self, session: &Session, item_id: &str) -> Result<(), AppError> {
        let existing = self
            .cms
            .get_item(&self.collections.events, item_id)
            .await
            .map_err(AppError::cms_read)?
            .ok_or_else(|| AppError::NotFound(format!("Event {}", item_id)))?;

        let mirror_id = self.mirror.find_mirror_id(&session.user_id).await?;
        let organisers = existing.ref_list(fields::event::ORGANISER);

        match mirror_id {
            Some(id) if organisers.contains(&id) => Ok(()),
            _ => {
                tracing::warn!(
                    user_id = %session.user_id,
                    item_id,
                    "Update refused: caller does not own event"
                );
                Err(AppError::NotPrivileged)
            }
        }
    }

    /// One event by id.
    pub async fn get_event(&self, item_id: &str) -> Result<EventRecord, AppError> {
        self.cms
            .get_item(&self.collections.events, item_id)
            .await
            .map_err(AppError::cms_read)?
            .map(|item| EventRecord::from(&item))
            .ok_or_else(|| AppError::NotFound(format!("Event {}", item_id)))
    }

    /// All events, or only the caller's when `mine` is set.
    pub async fn list_events(
        &self,
        session: &Session,
        mine: bool,
    ) -> Result<Vec<EventRecord>, AppError> {
        let items = self
            .cms
            .list_items(&self.collections.events)
            .await
            .map_err(AppError::cms_read)?;

        if !mine {
            return Ok(items.iter().map(EventRecord::from).collect());
        }

        let Some(mirror_id) = self.mirror.find_mirror_id(&session.user_id).await? else {
            return Ok(Vec::new());
        };

        Ok(items
            .iter()
            .filter(|item| item.ref_list(fields::event::ORGANISER).contains(&mirror_id))
            .map(EventRecord::from)
            .collect())
    }

    /// Active entries of a lookup collection.
    pub async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, AppError> {
        let collection_id = match kind {
            ReferenceKind::Categories => &self.collections.categories,
            ReferenceKind::Communities => &self.collections.communities,
            ReferenceKind::Locations => &self.collections.locations,
        };

        let items = self
            .cms
            .list_items(collection_id)
            .await
            .map_err(AppError::cms_read)?;
        Ok(ReferenceItem::active_from(&items))
    }
}
