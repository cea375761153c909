use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::description::DESCRIPTION_DEBOUNCE;
use crate::mention::MENTION_DEBOUNCE;

/// Client-side widget settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Base URL of the file manager, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Location of the local favourites database
    pub favourites_db: PathBuf,
    pub mention_debounce: Duration,
    pub description_debounce: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            favourites_db: "favourites.db".into(),
            mention_debounce: MENTION_DEBOUNCE,
            description_debounce: DESCRIPTION_DEBOUNCE,
        }
    }
}

impl WidgetConfig {
    /// Read `SIDEBAR_*` variables from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match var(key) {
                Some(raw) => {
                    let ms: u64 = raw
                        .parse()
                        .with_context(|| format!("{} must be a number of milliseconds, got {:?}", key, raw))?;
                    Ok(Duration::from_millis(ms))
                }
                None => Ok(default),
            }
        };

        Ok(Self {
            base_url: var("SIDEBAR_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            favourites_db: var("SIDEBAR_FAVOURITES_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.favourites_db),
            mention_debounce: millis("SIDEBAR_MENTION_DEBOUNCE_MS", defaults.mention_debounce)?,
            description_debounce: millis(
                "SIDEBAR_DESCRIPTION_DEBOUNCE_MS",
                defaults.description_debounce,
            )?,
        })
    }
}
