use std::sync::Arc;

use sidebar_db::Database;

use crate::dispatcher::Dispatcher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub features: Features,
    pub dispatcher: Dispatcher,
}

/// Which widgets are served. A disabled widget answers `403`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub chat: bool,
    pub description: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            chat: true,
            description: true,
        }
    }
}
