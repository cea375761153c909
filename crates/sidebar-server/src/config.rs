use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use sidebar_api::state::Features;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub features: Features,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("SIDEBAR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SIDEBAR_JWT_SECRET is unset or still a placeholder; it must match the secret tokens are signed with");
        }

        let port = match var("SIDEBAR_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SIDEBAR_PORT must be a port number, got {:?}", raw))?,
            None => 3000,
        };

        let flag = |key: &str| -> Result<bool> {
            match var(key).as_deref() {
                None => Ok(true),
                Some("1" | "true" | "yes" | "on") => Ok(true),
                Some("0" | "false" | "no" | "off") => Ok(false),
                Some(other) => bail!("{} must be true or false, got {:?}", key, other),
            }
        };

        Ok(Self {
            host: var("SIDEBAR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("SIDEBAR_DB_PATH")
                .unwrap_or_else(|| "sidebar.db".into())
                .into(),
            jwt_secret,
            features: Features {
                chat: flag("SIDEBAR_CHAT_ENABLED")?,
                description: flag("SIDEBAR_DESCRIPTION_ENABLED")?,
            },
        })
    }
}
