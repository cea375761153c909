use serde::{Deserialize, Serialize};

/// Events published by the widget backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SidebarEvent {
    /// A chat message was posted on a path
    MessageCreate {
        path: String,
        author: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A posted message mentions a user
    Mention {
        path: String,
        author: String,
        mention: String,
        message: String,
    },

    /// The description of a path was saved
    DescriptionUpdate { path: String },
}

impl SidebarEvent {
    /// The path the event is about.
    pub fn path(&self) -> &str {
        match self {
            Self::MessageCreate { path, .. } => path,
            Self::Mention { path, .. } => path,
            Self::DescriptionUpdate { path } => path,
        }
    }
}
