use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use sidebar_db::models::UserRow;
use sidebar_types::api::{Claims, CreateMessageRequest, ResultEnvelope, ResultsEnvelope};
use sidebar_types::events::SidebarEvent;
use sidebar_types::models::ChatMessage;

use crate::PathQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Handles mentioned in a message: `@` at the start or after whitespace, up to
/// the next whitespace. Each handle is reported once.
pub fn extract_mentions(message: &str) -> Vec<&str> {
    let mut handles: Vec<&str> = Vec::new();
    let mut prev: Option<char> = None;
    for (idx, c) in message.char_indices() {
        if c == '@' && prev.is_none_or(char::is_whitespace) {
            let rest = &message[idx + 1..];
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let handle = &rest[..end];
            if !handle.is_empty() && !handles.contains(&handle) {
                handles.push(handle);
            }
        }
        prev = Some(c);
    }
    handles
}

/// Directory name of a mentioned handle. Unknown handles and failed lookups
/// fall back to the handle with its dots turned back into spaces.
fn mentioned_name(handle: &str, lookup: anyhow::Result<Option<UserRow>>) -> String {
    match lookup {
        Ok(Some(user)) => user.name,
        Ok(None) => handle.replace('.', " "),
        Err(e) => {
            warn!("Resolving mention @{} failed: {:#}", handle, e);
            handle.replace('.', " ")
        }
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query.checked()?.to_string();

    // Run blocking DB query off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_messages(&path)).await??;

    let messages: Vec<ChatMessage> = rows
        .into_iter()
        .map(|row| ChatMessage {
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(|| {
                warn!("Corrupt timestamp {} on message '{}'", row.created_at, row.id);
                DateTime::<Utc>::default()
            }),
            path: row.path,
            author: row.author,
            message: row.message,
        })
        .collect();

    Ok(Json(ResultsEnvelope::ok(messages)))
}

pub async fn create_message(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query.checked()?.to_string();
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid parameters"));
    }

    let now = Utc::now();
    let db = state.clone();
    let (p, author, message) = (path.clone(), claims.username.clone(), req.message.clone());
    let mentioned = tokio::task::spawn_blocking(move || {
        db.db.insert_message(
            &Uuid::new_v4().to_string(),
            &p,
            &author,
            &message,
            now.timestamp(),
        )?;

        // The message is stored; from here on nothing may fail the request.
        let names = extract_mentions(&message)
            .into_iter()
            .map(|handle| mentioned_name(handle, db.db.get_user_by_handle(handle)))
            .collect::<Vec<_>>();
        Ok::<_, anyhow::Error>(names)
    })
    .await??;

    debug!(path = %path, author = %claims.username, mentions = mentioned.len(), "Message created");

    for mention in mentioned {
        state.dispatcher.broadcast(SidebarEvent::Mention {
            path: path.clone(),
            author: claims.username.clone(),
            mention,
            message: req.message.clone(),
        });
    }
    state.dispatcher.broadcast(SidebarEvent::MessageCreate {
        path,
        author: claims.username,
        message: req.message,
        timestamp: now,
    });

    Ok(Json(ResultEnvelope::<()>::ok(None)))
}
