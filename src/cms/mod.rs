// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CMS layer: typed items and the collection API the rest of the app uses.
//!
//! The CMS is an external system of record. Everything here goes through
//! the [`CmsApi`] trait so services can be exercised against an in-memory
//! collection in tests.

pub mod webflow;

pub use webflow::WebflowClient;

use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field-data keys, fixed by the CMS collection schemas.
pub mod fields {
    /// Users collection.
    pub mod user {
        pub const NAME: &str = "name";
        pub const FULL_NAME: &str = "full-name";
        pub const SLUG: &str = "slug";
        pub const EMAIL: &str = "email";
        pub const PHONE: &str = "phone";
        pub const EXTERNAL_ID: &str = "clerk-user-id";
        pub const AVATAR: &str = "profile-image";
    }

    /// Events collection.
    pub mod event {
        pub const NAME: &str = "name";
        pub const DESCRIPTION: &str = "description";
        pub const CLUB_NAME: &str = "club-name";
        pub const DATE_AND_TIME: &str = "date-and-time";
        pub const ADDRESS: &str = "address";
        pub const THUMBNAIL: &str = "thumbnail";
        pub const TICKET_LINK: &str = "ticket-link";
        pub const TIMEZONE: &str = "timezone";
        pub const LOCATION: &str = "location";
        pub const ORGANISER: &str = "organiser-name";
        pub const COMMUNITIES: &str = "event-community";
        pub const CATEGORIES: &str = "places-2";
    }

    /// Categories, communities and locations.
    pub mod reference {
        pub const NAME: &str = "name";
    }
}

/// Field-data map of a CMS item.
pub type FieldData = Map<String, Value>;

/// A CMS collection item as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CmsItem {
    pub id: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub last_published: Option<String>,
    #[serde(default)]
    pub field_data: FieldData,
}

impl CmsItem {
    /// String field, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field_data.get(key).and_then(Value::as_str)
    }

    /// Reference-list field; a bare string counts as a single reference.
    pub fn ref_list(&self, key: &str) -> Vec<String> {
        match self.field_data.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Visible to the public: neither archived nor draft.
    pub fn is_active(&self) -> bool {
        !self.is_archived && !self.is_draft
    }
}

/// Body of a create or update call.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemWrite {
    pub field_data: FieldData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

/// Which representation of an item an update is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Pre-publish representation (`PATCH .../items/{id}`).
    Staging,
    /// Published representation (`PATCH .../items/{id}/live`).
    Live,
}

/// Collection/item CRUD on the CMS.
#[async_trait]
pub trait CmsApi: Send + Sync {
    /// Every item in the collection, across all pages.
    async fn list_items(&self, collection_id: &str) -> Result<Vec<CmsItem>, UpstreamError>;

    /// A single staged item, `None` if the CMS reports it missing.
    async fn get_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Option<CmsItem>, UpstreamError>;

    /// Create a staged item.
    async fn create_item(
        &self,
        collection_id: &str,
        item: &ItemWrite,
    ) -> Result<CmsItem, UpstreamError>;

    /// Update an item on the chosen target.
    async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        item: &ItemWrite,
        target: WriteTarget,
    ) -> Result<CmsItem, UpstreamError>;

    /// Publish staged items.
    async fn publish_items(
        &self,
        collection_id: &str,
        item_ids: &[String],
    ) -> Result<(), UpstreamError>;
}
