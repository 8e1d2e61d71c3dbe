// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod events;
pub mod identity;
pub mod images;
pub mod mirror;
pub mod onboarding;
pub mod svix;

pub use events::{EventGate, ReferenceKind};
pub use identity::{ClerkClient, IdentityProvider};
pub use images::{ImageHost, ImageUpload, WebflowAssetHost};
pub use mirror::{CollectionScanIndex, MirrorIndex, MirrorSyncService, SyncOutcome};
pub use onboarding::{GateDecision, OnboardingService, OnboardingState, RouteClass};
