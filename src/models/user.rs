// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User models: the identity provider's view and the CMS mirror record.

use crate::cms::{fields, CmsItem, FieldData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder used when a user has neither a name nor an email.
pub const FALLBACK_NAME: &str = "User";

/// Metadata bag keys the application owns. Unknown keys are preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

impl UserMetadata {
    /// Trimmed display name, if one is set and non-empty.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_onboarding_complete(&self) -> bool {
        self.onboarding_complete == Some(true)
    }
}

/// User profile as held by the identity provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityUser {
    /// External user id (stable for the user's lifetime)
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub primary_email: Option<String>,
    pub primary_phone: Option<String>,
    pub image_url: Option<String>,
    pub metadata: UserMetadata,
}

/// Identity-provider user object as serialized by its API and webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUserPayload {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_phone_number_id: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub unsafe_metadata: UserMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumber {
    pub id: String,
    pub phone_number: String,
}

impl From<IdentityUserPayload> for IdentityUser {
    fn from(raw: IdentityUserPayload) -> Self {
        let primary_email = raw.primary_email_address_id.as_ref().and_then(|id| {
            raw.email_addresses
                .iter()
                .find(|e| &e.id == id)
                .map(|e| e.email_address.clone())
        });
        let primary_phone = raw.primary_phone_number_id.as_ref().and_then(|id| {
            raw.phone_numbers
                .iter()
                .find(|p| &p.id == id)
                .map(|p| p.phone_number.clone())
        });

        Self {
            id: raw.id,
            first_name: raw.first_name,
            last_name: raw.last_name,
            primary_email,
            primary_phone,
            image_url: raw.image_url,
            metadata: raw.unsafe_metadata,
        }
    }
}

/// Display fields computed from an identity profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub full_name: String,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: String,
}

impl ResolvedProfile {
    /// `full_name` falls back to the email, then to a placeholder.
    /// `display_name` prefers the metadata bag and falls back to `full_name`.
    pub fn from_identity(user: &IdentityUser) -> Self {
        let joined = format!(
            "{} {}",
            user.first_name.as_deref().unwrap_or(""),
            user.last_name.as_deref().unwrap_or("")
        );
        let joined = joined.trim();

        let email = user.primary_email.clone().unwrap_or_default();
        let full_name = if !joined.is_empty() {
            joined.to_string()
        } else if !email.is_empty() {
            email.clone()
        } else {
            FALLBACK_NAME.to_string()
        };

        let display_name = user
            .metadata
            .display_name()
            .map(str::to_string)
            .unwrap_or_else(|| full_name.clone());

        Self {
            full_name,
            display_name,
            email,
            phone: user.primary_phone.clone().filter(|p| !p.is_empty()),
            avatar_url: user.image_url.clone().unwrap_or_default(),
        }
    }
}

/// Deterministic mirror slug: `user-<id>`, lower-cased, anything outside
/// `[a-z0-9-]` replaced with `-`.
pub fn mirror_slug(external_user_id: &str) -> String {
    format!("user-{}", external_user_id)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// A record in the CMS users collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorUser {
    /// CMS item id (the "mirror id")
    pub mirror_id: String,
    pub external_user_id: String,
    pub display_name: String,
    pub full_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: String,
    pub slug: String,
}

impl MirrorUser {
    /// Parse a users-collection item; `None` if it carries no external id.
    pub fn from_item(item: &CmsItem) -> Option<Self> {
        let external_user_id = item.str_field(fields::user::EXTERNAL_ID)?.to_string();
        let text = |key: &str| item.str_field(key).unwrap_or_default().to_string();

        Some(Self {
            mirror_id: item.id.clone(),
            external_user_id,
            display_name: text(fields::user::NAME),
            full_name: item
                .str_field(fields::user::FULL_NAME)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            email: text(fields::user::EMAIL),
            phone: item
                .str_field(fields::user::PHONE)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            avatar_url: text(fields::user::AVATAR),
            slug: text(fields::user::SLUG),
        })
    }

    /// The record as written from `profile`, for when the CMS cannot list it yet.
    pub fn from_profile(mirror_id: &str, external_user_id: &str, profile: &ResolvedProfile) -> Self {
        Self {
            mirror_id: mirror_id.to_string(),
            external_user_id: external_user_id.to_string(),
            display_name: profile.display_name.clone(),
            full_name: Some(profile.full_name.clone()),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            avatar_url: profile.avatar_url.clone(),
            slug: mirror_slug(external_user_id),
        }
    }

    /// Field data for a new record.
    pub fn new_field_data(external_user_id: &str, profile: &ResolvedProfile) -> FieldData {
        let mut data = FieldData::new();
        data.insert(fields::user::NAME.into(), profile.display_name.clone().into());
        data.insert(fields::user::FULL_NAME.into(), profile.full_name.clone().into());
        data.insert(fields::user::SLUG.into(), mirror_slug(external_user_id).into());
        data.insert(fields::user::EMAIL.into(), profile.email.clone().into());
        data.insert(fields::user::EXTERNAL_ID.into(), external_user_id.into());
        data.insert(fields::user::AVATAR.into(), profile.avatar_url.clone().into());
        if let Some(phone) = &profile.phone {
            data.insert(fields::user::PHONE.into(), phone.clone().into());
        }
        data
    }

    /// Display fields that differ from `profile`; empty when nothing changed.
    pub fn display_diff(&self, profile: &ResolvedProfile) -> FieldData {
        let mut diff = FieldData::new();
        if self.display_name != profile.display_name {
            diff.insert(fields::user::NAME.into(), profile.display_name.clone().into());
        }
        if self.full_name.as_deref() != Some(profile.full_name.as_str()) {
            diff.insert(fields::user::FULL_NAME.into(), profile.full_name.clone().into());
        }
        diff
    }
}
