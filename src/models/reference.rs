// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reference lookups (categories, communities, locations).

use crate::cms::{fields, CmsItem};
use serde::Serialize;

/// Lookup-table entry shown in pickers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceItem {
    pub id: String,
    pub name: String,
}

impl ReferenceItem {
    /// Active items only, in CMS order.
    pub fn active_from(items: &[CmsItem]) -> Vec<Self> {
        items
            .iter()
            .filter(|item| item.is_active())
            .map(|item| Self {
                id: item.id.clone(),
                name: item
                    .str_field(fields::reference::NAME)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }
}
