use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::debug;

use sidebar_types::api::{ResultEnvelope, UpdateDescriptionRequest};
use sidebar_types::events::SidebarEvent;
use sidebar_types::models::Description;

use crate::PathQuery;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_description(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query.checked()?.to_string();

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_description(&path)).await??;

    let description = row.map(|row| Description {
        path: row.path,
        text: row.text,
    });
    Ok(Json(ResultEnvelope::ok(description)))
}

pub async fn update_description(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    Json(req): Json<UpdateDescriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query.checked()?.to_string();

    let db = state.clone();
    let p = path.clone();
    tokio::task::spawn_blocking(move || db.db.upsert_description(&p, &req.text)).await??;

    debug!(path = %path, "Description saved");
    state
        .dispatcher
        .broadcast(SidebarEvent::DescriptionUpdate { path });
    Ok(Json(ResultEnvelope::<()>::ok(None)))
}
