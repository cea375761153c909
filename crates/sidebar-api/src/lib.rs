//! HTTP backend of the chat and description sidebar widgets.

pub mod description;
pub mod dispatcher;
pub mod error;
pub mod lookup;
pub mod messages;
pub mod middleware;
pub mod state;

use axum::{Router, middleware::from_fn_with_state, routing::get};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// `?path=` of the widget endpoints.
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

impl PathQuery {
    /// The requested path; must be absolute and free of `..` segments.
    pub fn checked(&self) -> Result<&str, ApiError> {
        let path = self.path.as_str();
        if !path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
            return Err(ApiError::BadRequest("Invalid path"));
        }
        Ok(path)
    }
}

/// All widget routes, each group behind its feature flag.
pub fn router(state: AppState) -> Router {
    let chat = Router::new()
        .route(
            "/api/plg_widget_chat/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/api/plg_widget_chat/lookup", get(lookup::lookup_users))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .route_layer(from_fn_with_state(state.clone(), middleware::chat_enabled));

    let description = Router::new()
        .route(
            "/api/plg_widget_description/description",
            get(description::get_description).put(description::update_description),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::description_enabled,
        ));

    Router::new().merge(chat).merge(description).with_state(state)
}
