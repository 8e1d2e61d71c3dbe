// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event models: create/update commands and the record read back from the CMS.

use crate::cms::{fields, CmsItem, FieldData};
use crate::error::{AppError, FieldViolation};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

/// Uploaded image as stored in a CMS image field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub file_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Thumbnail value: an existing URL or an uploaded asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Thumbnail {
    Uploaded(ImageDescriptor),
    Url(String),
}

impl Thumbnail {
    fn is_present(&self) -> bool {
        match self {
            Thumbnail::Uploaded(img) => !img.url.is_empty(),
            Thumbnail::Url(url) => !url.trim().is_empty(),
        }
    }
}

/// Image file submitted with a create request, uploaded before the CMS write.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingImage {
    pub file_name: String,
    pub content_type: String,
    /// Base64-encoded file contents
    pub data: String,
}

impl PendingImage {
    /// Decoded file bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, AppError> {
        let bytes = BASE64
            .decode(self.data.trim())
            .map_err(|_| AppError::BadRequest("Image data is not valid base64".to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Image file is empty".to_string()));
        }
        Ok(bytes)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn required_datetime(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .map(|_| ())
        .map_err(|_| {
            ValidationError::new("invalid").with_message("must be an RFC 3339 date and time".into())
        })
}

fn thumbnail_source(req: &CreateEventRequest) -> Result<(), ValidationError> {
    let has_thumbnail = req.thumbnail.as_ref().is_some_and(Thumbnail::is_present);
    if has_thumbnail || req.pending_image.is_some() {
        return Ok(());
    }
    Err(ValidationError::new("thumbnail"))
}

/// Request to create an event.
///
/// Every field is checked in one pass; see [`CreateEventRequest::violations`].
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "thumbnail_source", skip_on_field_errors = false))]
pub struct CreateEventRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub club_name: String,
    #[serde(default)]
    #[validate(custom(function = "required_datetime"))]
    pub date_and_time: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub address: String,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub pending_image: Option<PendingImage>,
    #[serde(default)]
    pub ticket_link: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub location: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 2, message = "select 1-2 communities"))]
    pub communities: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 2, message = "select 1-2 categories"))]
    pub categories: Vec<String>,
    /// Accepted for compatibility and always replaced by the caller's mirror id.
    #[serde(default)]
    pub organiser: Option<String>,
}

/// Labels in the order violations are reported.
const CREATE_FIELDS: &[(&str, &str)] = &[
    ("name", "Event Name"),
    ("description", "Description"),
    ("club_name", "Club Name"),
    ("date_and_time", "Date and Time"),
    ("address", "Address"),
    ("thumbnail", "Thumbnail Image"),
    ("location", "Location"),
    ("communities", "Communities"),
    ("categories", "Categories"),
];

impl CreateEventRequest {
    /// All violations at once, in form order. Empty when the request is valid.
    pub fn violations(&self) -> Vec<FieldViolation> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_violations(&errors, CREATE_FIELDS),
        }
    }

    /// CMS field data with the organiser bound to `mirror_id`.
    pub fn to_field_data(&self, thumbnail: &Thumbnail, mirror_id: &str) -> FieldData {
        use fields::event as f;

        let mut data = FieldData::new();
        data.insert(f::NAME.into(), self.name.trim().into());
        data.insert(f::DESCRIPTION.into(), self.description.clone().into());
        data.insert(f::CLUB_NAME.into(), self.club_name.trim().into());
        data.insert(f::DATE_AND_TIME.into(), self.date_and_time.trim().into());
        data.insert(f::ADDRESS.into(), self.address.trim().into());
        data.insert(f::THUMBNAIL.into(), thumbnail_value(thumbnail));
        data.insert(f::TICKET_LINK.into(), self.ticket_link.trim().into());
        data.insert(f::TIMEZONE.into(), self.timezone.trim().into());
        data.insert(f::LOCATION.into(), self.location.trim().into());
        data.insert(f::ORGANISER.into(), Value::from(vec![mirror_id.to_string()]));
        data.insert(f::COMMUNITIES.into(), Value::from(self.communities.clone()));
        data.insert(f::CATEGORIES.into(), Value::from(self.categories.clone()));
        data
    }
}

fn thumbnail_value(thumbnail: &Thumbnail) -> Value {
    serde_json::to_value(thumbnail).unwrap_or(Value::Null)
}

/// Partial update of an event. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub club_name: Option<String>,
    pub date_and_time: Option<String>,
    pub address: Option<String>,
    pub thumbnail: Option<Thumbnail>,
    pub ticket_link: Option<String>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    #[validate(length(min = 1, max = 2, message = "select 1-2 communities"))]
    pub communities: Option<Vec<String>>,
    #[validate(length(min = 1, max = 2, message = "select 1-2 categories"))]
    pub categories: Option<Vec<String>>,
    /// Never forwarded: the organiser is fixed at creation.
    pub organiser: Option<String>,
}

const PATCH_FIELDS: &[(&str, &str)] = &[
    ("date_and_time", "Date and Time"),
    ("communities", "Communities"),
    ("categories", "Categories"),
];

impl EventPatch {
    pub fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_violations(&errors, PATCH_FIELDS),
        };

        if let Some(when) = &self.date_and_time {
            if let Err(e) = required_datetime(when) {
                violations.insert(0, violation("date_and_time", "Date and Time", &e));
            }
        }
        violations
    }

    /// CMS field data for the supplied fields. The organiser is never included.
    pub fn to_field_data(&self) -> FieldData {
        use fields::event as f;

        let mut data = FieldData::new();
        let text_fields = [
            (f::NAME, &self.name),
            (f::DESCRIPTION, &self.description),
            (f::CLUB_NAME, &self.club_name),
            (f::DATE_AND_TIME, &self.date_and_time),
            (f::ADDRESS, &self.address),
            (f::TICKET_LINK, &self.ticket_link),
            (f::TIMEZONE, &self.timezone),
            (f::LOCATION, &self.location),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                data.insert(key.into(), value.trim().into());
            }
        }
        if let Some(thumbnail) = &self.thumbnail {
            data.insert(f::THUMBNAIL.into(), thumbnail_value(thumbnail));
        }
        if let Some(ids) = &self.communities {
            data.insert(f::COMMUNITIES.into(), Value::from(ids.clone()));
        }
        if let Some(ids) = &self.categories {
            data.insert(f::CATEGORIES.into(), Value::from(ids.clone()));
        }
        data
    }
}

fn violation(field: &str, label: &str, err: &ValidationError) -> FieldViolation {
    let message = match &err.message {
        Some(msg) => format!("{}: {}", label, msg),
        None if err.code == "invalid" => format!("{} is invalid", label),
        None => format!("{} is required", label),
    };
    FieldViolation::new(field, message)
}

fn collect_violations(errors: &ValidationErrors, order: &[(&str, &str)]) -> Vec<FieldViolation> {
    let field_errors = errors.field_errors();
    let schema_errors = field_errors.get("__all__");

    order
        .iter()
        .filter_map(|(field, label)| {
            if let Some(first) = field_errors.get(*field).and_then(|errs| errs.first()) {
                return Some(violation(field, label, first));
            }
            schema_errors
                .and_then(|errs| errs.iter().find(|e| e.code == *field))
                .map(|e| violation(field, label, e))
        })
        .collect()
}

/// Which representation an update should be written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Staging,
    Live,
}

/// Request to update an event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub fields: EventPatch,
    /// Forwarded as given; omitted means "leave as is".
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub update_mode: Option<UpdateMode>,
}

/// Event as read back from the CMS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub club_name: String,
    pub date_and_time: String,
    pub address: String,
    pub thumbnail: Option<Value>,
    pub ticket_link: String,
    pub timezone: String,
    pub location: Option<String>,
    pub organiser: Option<String>,
    pub communities: Vec<String>,
    pub categories: Vec<String>,
    pub is_draft: bool,
    pub is_archived: bool,
    pub created_on: Option<String>,
    pub last_updated: Option<String>,
    pub last_published: Option<String>,
}

impl From<&CmsItem> for EventRecord {
    fn from(item: &CmsItem) -> Self {
        use fields::event as f;
        let text = |key: &str| item.str_field(key).unwrap_or_default().to_string();

        Self {
            id: item.id.clone(),
            name: text(f::NAME),
            description: text(f::DESCRIPTION),
            club_name: text(f::CLUB_NAME),
            date_and_time: text(f::DATE_AND_TIME),
            address: text(f::ADDRESS),
            thumbnail: item.field_data.get(f::THUMBNAIL).cloned(),
            ticket_link: text(f::TICKET_LINK),
            timezone: text(f::TIMEZONE),
            location: item.ref_list(f::LOCATION).into_iter().next(),
            organiser: item.ref_list(f::ORGANISER).into_iter().next(),
            communities: item.ref_list(f::COMMUNITIES),
            categories: item.ref_list(f::CATEGORIES),
            is_draft: item.is_draft,
            is_archived: item.is_archived,
            created_on: item.created_on.clone(),
            last_updated: item.last_updated.clone(),
            last_published: item.last_published.clone(),
        }
    }
}
