use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer-token claims. Tokens are issued by the host application's login
/// flow; the widget backend only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Envelopes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// `{"status":"ok","results":[...]}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResultsEnvelope<T> {
    pub status: Status,
    #[serde(default)]
    pub results: Vec<T>,
}

impl<T> ResultsEnvelope<T> {
    pub fn ok(results: Vec<T>) -> Self {
        Self {
            status: Status::Ok,
            results,
        }
    }
}

/// `{"status":"ok","result":...}`; `result` is `null` when there is nothing to return.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResultEnvelope<T> {
    pub status: Status,
    #[serde(default)]
    pub result: Option<T>,
}

impl<T> ResultEnvelope<T> {
    pub fn ok(result: Option<T>) -> Self {
        Self {
            status: Status::Ok,
            result,
        }
    }
}

/// `{"status":"error","message":"..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: Status,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }
}

// -- Chat --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub message: String,
}

// -- Descriptions --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDescriptionRequest {
    pub text: String,
}
