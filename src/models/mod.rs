// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod event;
pub mod reference;
pub mod session;
pub mod user;

pub use event::{
    CreateEventRequest, EventPatch, EventRecord, ImageDescriptor, PendingImage, Thumbnail,
    UpdateEventRequest, UpdateMode,
};
pub use reference::ReferenceItem;
pub use session::Session;
pub use user::{IdentityUser, MirrorUser, ResolvedProfile, UserMetadata};
