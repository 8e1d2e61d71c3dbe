// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webflow Data API (v2) client for collection items.
//!
//! Handles:
//! - Paged item listing (the API caps a page at 100 items)
//! - Staged create / staged or live update
//! - Bulk publish

use super::{CmsApi, CmsItem, ItemWrite, WriteTarget};
use crate::error::UpstreamError;
use crate::upstream::{check_response, check_response_json, http_client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest page the list endpoint will return.
const PAGE_LIMIT: u32 = 100;

/// Webflow collection API client.
#[derive(Clone)]
pub struct WebflowClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl WebflowClient {
    /// Create a new client. `timeout` bounds every request.
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Attach auth and API version headers.
    pub(crate) fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.api_token)
            .header("accept-version", "2.0.0")
    }

    /// Absolute URL for an API path such as `/sites/{id}/assets`.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Underlying HTTP client, for requests outside the API (asset storage).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn items_url(&self, collection_id: &str) -> String {
        format!("{}/collections/{}/items", self.base_url, collection_id)
    }

    async fn list_page(
        &self,
        collection_id: &str,
        offset: u32,
    ) -> Result<ItemListResponse, UpstreamError> {
        let response = self
            .request(reqwest::Method::GET, &self.items_url(collection_id))
            .query(&[("offset", offset), ("limit", PAGE_LIMIT)])
            .send()
            .await?;

        check_response_json(response).await
    }
}

#[async_trait]
impl CmsApi for WebflowClient {
    async fn list_items(&self, collection_id: &str) -> Result<Vec<CmsItem>, UpstreamError> {
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_page(collection_id, offset).await?;
            let fetched = page.items.len() as u32;
            items.extend(page.items);

            let total = page.pagination.map(|p| p.total).unwrap_or(0);
            offset += fetched;
            if fetched == 0 || offset >= total {
                break;
            }
        }

        tracing::debug!(collection_id, count = items.len(), "Listed collection items");
        Ok(items)
    }

    async fn get_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Option<CmsItem>, UpstreamError> {
        let url = format!("{}/{}", self.items_url(collection_id), item_id);
        let response = self.request(reqwest::Method::GET, &url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_response_json(response).await.map(Some)
    }

    async fn create_item(
        &self,
        collection_id: &str,
        item: &ItemWrite,
    ) -> Result<CmsItem, UpstreamError> {
        let response = self
            .request(reqwest::Method::POST, &self.items_url(collection_id))
            .json(item)
            .send()
            .await?;

        check_response_json(response).await
    }

    async fn update_item(
        &self,
        collection_id: &str,
        item_id: &str,
        item: &ItemWrite,
        target: WriteTarget,
    ) -> Result<CmsItem, UpstreamError> {
        let url = match target {
            WriteTarget::Staging => format!("{}/{}", self.items_url(collection_id), item_id),
            WriteTarget::Live => format!("{}/{}/live", self.items_url(collection_id), item_id),
        };

        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(item)
            .send()
            .await?;

        check_response_json(response).await
    }

    async fn publish_items(
        &self,
        collection_id: &str,
        item_ids: &[String],
    ) -> Result<(), UpstreamError> {
        let url = format!("{}/publish", self.items_url(collection_id));
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&PublishRequest { item_ids })
            .send()
            .await?;

        check_response(response).await
    }
}

/// One page of a collection listing.
#[derive(Debug, Deserialize)]
struct ItemListResponse {
    #[serde(default)]
    items: Vec<CmsItem>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    item_ids: &'a [String],
}
