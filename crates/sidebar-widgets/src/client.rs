//! HTTP collaborators talking to the widget backend.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use sidebar_types::api::{
    CreateMessageRequest, ErrorEnvelope, ResultEnvelope, ResultsEnvelope, UpdateDescriptionRequest,
};
use sidebar_types::models::{ChatMessage, Description, UserSuggestion};

use crate::config::WidgetConfig;
use crate::context::{NavigationContext, ShareContext};
use crate::description::DescriptionSource;
use crate::mention::UserDirectory;

const CHAT: &str = "/api/plg_widget_chat";
const DESCRIPTION: &str = "/api/plg_widget_description/description";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Client for the chat and description widget endpoints.
#[derive(Debug, Clone)]
pub struct WidgetClient {
    http: Client,
    base_url: String,
    share: ShareContext,
    token: Option<String>,
}

impl WidgetClient {
    pub fn new(base_url: impl Into<String>, share: ShareContext) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            share,
            token: None,
        }
    }

    pub fn from_config(config: &WidgetConfig, share: ShareContext) -> Self {
        Self::new(config.base_url.clone(), share)
    }

    /// Authenticate chat requests with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, endpoint));
        let share = self.share.current_share_id();
        if !share.is_empty() {
            req = req.query(&[("share", share)]);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    pub async fn lookup_users(&self, query: &str) -> Result<Vec<UserSuggestion>, ClientError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("{}/lookup", CHAT))
            .query(&[("q", query)])
            .send()
            .await?;
        let envelope: ResultsEnvelope<UserSuggestion> = decode(resp).await?;
        Ok(envelope.results)
    }

    /// Messages under `path`, newest first.
    pub async fn list_messages(&self, path: &str) -> Result<Vec<ChatMessage>, ClientError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("{}/messages", CHAT))
            .query(&[("path", path)])
            .send()
            .await?;
        let envelope: ResultsEnvelope<ChatMessage> = decode(resp).await?;
        let mut messages = envelope.results;
        messages.reverse();
        Ok(messages)
    }

    pub async fn create_message(&self, path: &str, message: &str) -> Result<(), ClientError> {
        let resp = self
            .request(reqwest::Method::POST, &format!("{}/messages", CHAT))
            .query(&[("path", path)])
            .json(&CreateMessageRequest {
                message: message.to_string(),
            })
            .send()
            .await?;
        let _: ResultEnvelope<serde_json::Value> = decode(resp).await?;
        Ok(())
    }

    pub async fn fetch_description(&self, path: &str) -> Result<Option<Description>, ClientError> {
        let resp = self
            .request(reqwest::Method::GET, DESCRIPTION)
            .query(&[("path", path)])
            .send()
            .await?;
        let envelope: ResultEnvelope<Description> = decode(resp).await?;
        Ok(envelope.result)
    }

    pub async fn save_description(&self, path: &str, text: &str) -> Result<(), ClientError> {
        let resp = self
            .request(reqwest::Method::PUT, DESCRIPTION)
            .query(&[("path", path)])
            .json(&UpdateDescriptionRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        let _: ResultEnvelope<serde_json::Value> = decode(resp).await?;
        Ok(())
    }
}

/// Decode a success envelope, or turn an error envelope into `ClientError::Backend`.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body = resp.text().await?;
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(ClientError::Backend {
        status: status.as_u16(),
        message,
    })
}

impl UserDirectory for WidgetClient {
    async fn search_users(&self, query: &str) -> anyhow::Result<Vec<UserSuggestion>> {
        match self.lookup_users(query).await {
            Ok(users) => Ok(users),
            Err(e) => {
                debug!("User lookup failed: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

impl DescriptionSource for WidgetClient {
    async fn get_description(&self, path: &str) -> anyhow::Result<Option<Description>> {
        Ok(self.fetch_description(path).await?)
    }

    async fn update_description(&self, path: &str, text: &str) -> anyhow::Result<()> {
        Ok(self.save_description(path, text).await?)
    }
}
