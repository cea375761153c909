use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user offered by the mention autocomplete. The wire name of the field is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSuggestion {
    #[serde(rename = "name")]
    pub display_name: String,
}

impl UserSuggestion {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }

    /// The text inserted after `@` when this suggestion is picked.
    pub fn handle(&self) -> String {
        handle_for(&self.display_name)
    }
}

/// Replace every whitespace run in a display name with a single `.`.
pub fn handle_for(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut in_whitespace = false;
    for c in display_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('.');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

/// Identity of the storage backend the session is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(alias = "backendID")]
    pub backend_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavouriteKind {
    Directory,
    File,
}

/// A favourited path, scoped to a backend and a share.
///
/// `parent_path` is always derived from `path`, so the fields are only
/// readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavouriteRecord {
    backend_id: String,
    share_id: String,
    path: String,
    parent_path: String,
}

impl FavouriteRecord {
    pub fn new(
        backend_id: impl Into<String>,
        share_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            backend_id: backend_id.into(),
            share_id: share_id.into(),
            parent_path: parent_path(&path).to_string(),
            path,
        }
    }

    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    pub fn share_id(&self) -> &str {
        &self.share_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    /// Directories are stored with a trailing slash.
    pub fn kind(&self) -> FavouriteKind {
        if self.path.ends_with('/') {
            FavouriteKind::Directory
        } else {
            FavouriteKind::File
        }
    }

    /// Last path segment, without the trailing slash of a directory.
    pub fn name(&self) -> &str {
        let trimmed = self.path.strip_suffix('/').unwrap_or(&self.path);
        match trimmed.rfind('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

/// Strip the final segment (and its trailing slash, if any) from a path.
///
/// `/a/b/c` -> `/a/b/`, `/a/b/` -> `/a/`, `/` -> ``.
pub fn parent_path(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..=idx],
        None => "",
    }
}

/// A chat message attached to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub path: String,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub path: String,
    pub text: String,
}
