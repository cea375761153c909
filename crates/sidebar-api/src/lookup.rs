use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use sidebar_types::api::ResultsEnvelope;
use sidebar_types::models::UserSuggestion;

use crate::error::ApiError;
use crate::state::AppState;

const LOOKUP_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub share: String,
}

/// Directory users whose name starts with `q`. Shared-link visitors get no
/// suggestions.
pub async fn lookup_users(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !query.share.is_empty() {
        return Ok(Json(ResultsEnvelope::<UserSuggestion>::ok(Vec::new())));
    }

    let db = state.clone();
    let rows =
        tokio::task::spawn_blocking(move || db.db.search_users(&query.q, LOOKUP_LIMIT)).await??;

    let users = rows
        .into_iter()
        .map(|row| UserSuggestion::new(row.name))
        .collect();
    Ok(Json(ResultsEnvelope::<UserSuggestion>::ok(users)))
}
