// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory collaborators and app builders shared by integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use event_console::cms::{CmsApi, CmsItem, FieldData, ItemWrite, WriteTarget};
use event_console::config::{Config, SessionKey};
use event_console::error::UpstreamError;
use event_console::middleware::auth::create_session_token;
use event_console::models::{ImageDescriptor, IdentityUser, Session, UserMetadata};
use event_console::routes::create_router;
use event_console::services::{IdentityProvider, ImageHost, ImageUpload};
use event_console::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── CMS ─────────────────────────────────────────────────────

/// One call made against the in-memory CMS.
#[derive(Debug, Clone, PartialEq)]
pub enum CmsCall {
    List(String),
    Get(String, String),
    Create(String, ItemWrite),
    Update {
        collection: String,
        item_id: String,
        write: ItemWrite,
        target: WriteTarget,
    },
    Publish(String, Vec<String>),
}

struct StoredItem {
    item: CmsItem,
    /// Hidden items exist but are not returned by listings yet
    listed: bool,
}

/// CMS collections held in memory, with a call log.
#[derive(Default)]
pub struct InMemoryCms {
    collections: Mutex<HashMap<String, Vec<StoredItem>>>,
    calls: Mutex<Vec<CmsCall>>,
    next_id: AtomicUsize,
    list_delay_ms: AtomicUsize,
    hide_new_items: AtomicBool,
    fail_writes: Mutex<Option<(u16, String)>>,
    fail_lists: AtomicBool,
}

impl InMemoryCms {
    pub fn seed(&self, collection: &str, item: CmsItem) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(StoredItem { item, listed: true });
    }

    /// Every item in a collection, listed or not.
    pub fn items(&self, collection: &str) -> Vec<CmsItem> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|items| items.iter().map(|s| s.item.clone()).collect())
            .unwrap_or_default()
    }

    pub fn item(&self, collection: &str, item_id: &str) -> Option<CmsItem> {
        self.items(collection).into_iter().find(|i| i.id == item_id)
    }

    pub fn calls(&self) -> Vec<CmsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self, collection: &str) -> Vec<ItemWrite> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CmsCall::Create(col, write) if col == collection => Some(write),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self, collection: &str) -> Vec<(String, ItemWrite, WriteTarget)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CmsCall::Update {
                    collection: col,
                    item_id,
                    write,
                    target,
                } if col == collection => Some((item_id, write, target)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CmsCall::Create(..) | CmsCall::Update { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Delay every listing response, widening the lookup-then-create window.
    pub fn set_list_delay(&self, delay: Duration) {
        self.list_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Created items stay out of listings until [`InMemoryCms::reveal_all`].
    pub fn hide_new_items(&self, hide: bool) {
        self.hide_new_items.store(hide, Ordering::SeqCst);
    }

    pub fn reveal_all(&self) {
        for items in self.collections.lock().unwrap().values_mut() {
            for stored in items.iter_mut() {
                stored.listed = true;
            }
        }
    }

    pub fn fail_writes_with(&self, status: u16, body: &str) {
        *self.fail_writes.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: CmsCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_failure(&self) -> Option<UpstreamError> {
        self.fail_writes
            .lock()
            .unwrap()
            .clone()
            .map(|(status, body)| UpstreamError::Status { status, body })
    }
}

#[async_trait]
impl CmsApi for InMemoryCms {
    async fn list_items(&self, collection_id: &str) -> Result<Vec<CmsItem>, UpstreamError> {
        self.record(CmsCall::List(collection_id.to_string()));
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 500,
                body: "list failed".to_string(),
            });
        }

        let snapshot: Vec<CmsItem> = self
            .collections
            .lock()
            .unwrap()
            .get(collection_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|s| s.listed)
                    .map(|s| s.item.clone())
                    .collect()
            })
            .unwrap_or_default();

        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        Ok(snapshot)
    }

    async fn get_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Option<CmsItem>, UpstreamError> {
        self.record(CmsCall::Get(collection_id.to_string(), item_id.to_string()));
        Ok(self.item(collection_id, item_id))
    }

    async fn create_item(
        &self,
        collection_id: &str,
        item: &ItemWrite,
    ) -> Result<CmsItem, UpstreamError> {
        self.record(CmsCall::Create(collection_id.to_string(), item.clone()));
        if let Some(err) = self.write_failure() {
            return Err(err);
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = CmsItem {
            id: format!("{}_item_{}", collection_id, n),
            is_archived: item.is_archived.unwrap_or(false),
            is_draft: item.is_draft.unwrap_or(false),
            created_on: Some("2026-10-19T12:00:00Z".to_string()),
            last_updated: Some("2026-10-19T12:00:00Z".to_string()),
            last_published: None,
            field_data: item.field_data.clone(),
        };

        let listed = !self.hide_new_items.load(Ordering::SeqCst);
        self.collections
            .lock()
            .unwrap()
            .entry(collection_id.to_string())
            .or_default()
            .push(StoredItem {
                item: created.clone(),
                listed,
            });
        Ok(created)
    }

    async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        item: &ItemWrite,
        target: WriteTarget,
    ) -> Result<CmsItem, UpstreamError> {
        self.record(CmsCall::Update {
            collection: collection_id.to_string(),
            item_id: item_id.to_string(),
            write: item.clone(),
            target,
        });
        if let Some(err) = self.write_failure() {
            return Err(err);
        }

        let mut collections = self.collections.lock().unwrap();
        let stored = collections
            .get_mut(collection_id)
            .and_then(|items| items.iter_mut().find(|s| s.item.id == item_id))
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                body: "Requested resource not found".to_string(),
            })?;

        for (key, value) in &item.field_data {
            stored.item.field_data.insert(key.clone(), value.clone());
        }
        if let Some(draft) = item.is_draft {
            stored.item.is_draft = draft;
        }
        if let Some(archived) = item.is_archived {
            stored.item.is_archived = archived;
        }
        Ok(stored.item.clone())
    }

    async fn publish_items(
        &self,
        collection_id: &str,
        item_ids: &[String],
    ) -> Result<(), UpstreamError> {
        self.record(CmsCall::Publish(
            collection_id.to_string(),
            item_ids.to_vec(),
        ));
        let mut collections = self.collections.lock().unwrap();
        if let Some(items) = collections.get_mut(collection_id) {
            for stored in items.iter_mut().filter(|s| item_ids.contains(&s.item.id)) {
                stored.item.is_draft = false;
            }
        }
        Ok(())
    }
}

// ─── Identity provider ───────────────────────────────────────

/// Identity provider holding users in memory. Session ids are `sess_<user id>`.
pub struct FakeIdentity {
    users: Mutex<HashMap<String, IdentityUser>>,
    signing_key: Vec<u8>,
    pub user_reads: AtomicUsize,
    pub metadata_writes: AtomicUsize,
    pub refreshes: AtomicUsize,
    /// Metadata writes are accepted but not visible to reads
    pub drop_metadata_writes: AtomicBool,
}

impl FakeIdentity {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            signing_key: signing_key.to_vec(),
            user_reads: AtomicUsize::new(0),
            metadata_writes: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            drop_metadata_writes: AtomicBool::new(false),
        }
    }

    pub fn add_user(&self, user: IdentityUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn user(&self, user_id: &str) -> Option<IdentityUser> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    pub fn set_metadata(&self, user_id: &str, metadata: UserMetadata) {
        if let Some(user) = self.users.lock().unwrap().get_mut(user_id) {
            user.metadata = metadata;
        }
    }
}

fn not_found() -> UpstreamError {
    UpstreamError::Status {
        status: 404,
        body: "user not found".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, UpstreamError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        self.user(user_id).ok_or_else(not_found)
    }

    async fn update_metadata(
        &self,
        user_id: &str,
        patch: &UserMetadata,
    ) -> Result<IdentityUser, UpstreamError> {
        self.metadata_writes.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(user_id).ok_or_else(not_found)?;

        if self.drop_metadata_writes.load(Ordering::SeqCst) {
            return Ok(user.clone());
        }
        if patch.display_name.is_some() {
            user.metadata.display_name = patch.display_name.clone();
        }
        if patch.onboarding_complete.is_some() {
            user.metadata.onboarding_complete = patch.onboarding_complete;
        }
        for (key, value) in &patch.other {
            user.metadata.other.insert(key.clone(), value.clone());
        }
        Ok(user.clone())
    }

    async fn refresh_session(&self, session_id: &str) -> Result<String, UpstreamError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let user_id = session_id.strip_prefix("sess_").ok_or_else(not_found)?;
        let user = self.user(user_id).ok_or_else(not_found)?;

        create_session_token(&user.id, Some(session_id), &user.metadata, &self.signing_key)
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

// ─── Image host ──────────────────────────────────────────────

#[derive(Default)]
pub struct FakeImageHost {
    pub uploads: Mutex<Vec<ImageUpload>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, file: ImageUpload) -> Result<ImageDescriptor, UpstreamError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 413,
                body: "file too large".to_string(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(file.clone());
        Ok(ImageDescriptor {
            file_id: format!("asset_{}", uploads.len()),
            url: format!("https://cdn.test/{}", file.file_name),
            alt: None,
        })
    }
}

// ─── App builders ────────────────────────────────────────────

/// A router wired to in-memory collaborators.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub cms: Arc<InMemoryCms>,
    pub identity: Arc<FakeIdentity>,
    pub images: Arc<FakeImageHost>,
}

impl TestApp {
    /// Session token for a known user, carrying their current metadata.
    pub fn token_for(&self, user_id: &str) -> String {
        let user = self.identity.user(user_id).expect("unknown test user");
        session_token(&user.id, &user.metadata)
    }
}

pub fn signing_key() -> Vec<u8> {
    match Config::test_default().session_key {
        SessionKey::Secret(key) => key,
        SessionKey::RsaPem(_) => unreachable!("test config uses a shared secret"),
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

pub fn create_test_app_with_config(config: Config) -> TestApp {
    let cms = Arc::new(InMemoryCms::default());
    let identity = Arc::new(FakeIdentity::new(&signing_key()));
    let images = Arc::new(FakeImageHost::default());

    let state = Arc::new(
        AppState::new(config, identity.clone(), cms.clone(), images.clone())
            .expect("test state"),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        cms,
        identity,
        images,
    }
}

/// Session token with session id `sess_<user_id>`.
pub fn session_token(user_id: &str, metadata: &UserMetadata) -> String {
    let sid = format!("sess_{}", user_id);
    create_session_token(user_id, Some(&sid), metadata, &signing_key()).unwrap()
}

pub fn onboarded_metadata(display_name: &str) -> UserMetadata {
    UserMetadata {
        display_name: Some(display_name.to_string()),
        onboarding_complete: Some(true),
        ..Default::default()
    }
}

pub fn identity_user(id: &str, first: &str, last: &str, email: &str) -> IdentityUser {
    IdentityUser {
        id: id.to_string(),
        first_name: Some(first.to_string()).filter(|s| !s.is_empty()),
        last_name: Some(last.to_string()).filter(|s| !s.is_empty()),
        primary_email: Some(email.to_string()).filter(|s| !s.is_empty()),
        primary_phone: None,
        image_url: Some(format!("https://img.test/{}.png", id)),
        metadata: UserMetadata::default(),
    }
}

pub fn session_for(user: &IdentityUser) -> Session {
    Session {
        user_id: user.id.clone(),
        session_id: Some(format!("sess_{}", user.id)),
        metadata: user.metadata.clone(),
    }
}

/// A users-collection item as the CMS would return it.
pub fn mirror_item(item_id: &str, external_user_id: &str, name: &str, full_name: &str) -> CmsItem {
    let mut field_data = FieldData::new();
    field_data.insert("name".into(), json!(name));
    field_data.insert("full-name".into(), json!(full_name));
    field_data.insert("slug".into(), json!(format!("user-{}", external_user_id)));
    field_data.insert("email".into(), json!(""));
    field_data.insert("clerk-user-id".into(), json!(external_user_id));
    CmsItem {
        id: item_id.to_string(),
        is_archived: false,
        is_draft: false,
        created_on: None,
        last_updated: None,
        last_published: None,
        field_data,
    }
}

/// A reference (category/community/location) item.
pub fn reference_item(item_id: &str, name: &str, archived: bool, draft: bool) -> CmsItem {
    let mut field_data = FieldData::new();
    field_data.insert("name".into(), json!(name));
    CmsItem {
        id: item_id.to_string(),
        is_archived: archived,
        is_draft: draft,
        created_on: None,
        last_updated: None,
        last_published: None,
        field_data,
    }
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
