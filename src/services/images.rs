// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image host: event thumbnails are uploaded as CMS site assets.
//!
//! Upload is two steps. The asset is registered with its MD5 hash, which
//! returns a pre-signed storage form; the bytes are then posted to that form.

use crate::cms::WebflowClient;
use crate::error::UpstreamError;
use crate::models::ImageDescriptor;
use crate::upstream::{check_response, check_response_json};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A file ready for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Uploads images and returns the hosted descriptor.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, file: ImageUpload) -> Result<ImageDescriptor, UpstreamError>;
}

/// Site asset uploader.
#[derive(Clone)]
pub struct WebflowAssetHost {
    client: WebflowClient,
    site_id: String,
}

impl WebflowAssetHost {
    pub fn new(client: WebflowClient, site_id: &str) -> Self {
        Self {
            client,
            site_id: site_id.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssetRequest<'a> {
    file_name: &'a str,
    file_hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssetResponse {
    id: String,
    upload_url: String,
    #[serde(default)]
    upload_details: HashMap<String, String>,
    hosted_url: String,
}

#[async_trait]
impl ImageHost for WebflowAssetHost {
    async fn upload(&self, file: ImageUpload) -> Result<ImageDescriptor, UpstreamError> {
        let file_hash = hex::encode(md5::compute(&file.bytes).0);

        let url = self
            .client
            .api_url(&format!("/sites/{}/assets", self.site_id));
        let response = self
            .client
            .request(reqwest::Method::POST, &url)
            .json(&CreateAssetRequest {
                file_name: &file.file_name,
                file_hash,
            })
            .send()
            .await?;
        let asset: CreateAssetResponse = check_response_json(response).await?;

        // Storage expects the signed fields before the file part
        let mut form = Form::new();
        for (key, value) in asset.upload_details {
            form = form.text(key, value);
        }
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UpstreamError::Decode(format!("Invalid content type: {}", e)))?;
        form = form.part("file", part);

        let response = self
            .client
            .http()
            .post(&asset.upload_url)
            .multipart(form)
            .send()
            .await?;
        check_response(response).await?;

        tracing::info!(asset_id = %asset.id, file_name = %file.file_name, "Image uploaded");

        Ok(ImageDescriptor {
            file_id: asset.id,
            url: asset.hosted_url,
            alt: None,
        })
    }
}
