// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event collection routes. All writes go through the ownership gate.

use crate::error::Result;
use crate::models::{CreateEventRequest, EventRecord, Session, UpdateEventRequest};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/collection", get(list_events))
        .route("/api/collection/items", post(create_event))
        .route(
            "/api/collection/items/{item_id}",
            get(get_event).patch(update_event),
        )
}

#[derive(Debug, Deserialize)]
struct ListParams {
    /// Only events organised by the caller
    #[serde(default)]
    mine: bool,
}

#[derive(Serialize)]
pub struct EventListResponse {
    pub items: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub item: EventRecord,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<ListParams>,
) -> Result<Json<EventListResponse>> {
    let items = state.event_gate.list_events(&session, params.mine).await?;
    Ok(Json(EventListResponse { items }))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<EventRecord>> {
    Ok(Json(state.event_gate.get_event(&item_id).await?))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    let item = state.event_gate.create_event(&session, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventResponse {
            success: true,
            item,
        }),
    ))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>> {
    let item = state.event_gate.update_event(&session, &item_id, req).await?;
    Ok(Json(EventResponse {
        success: true,
        item,
    }))
}
