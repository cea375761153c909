//! Favourites sidebar: a local index of favourited paths, scoped to the
//! session's backend and the current share.

pub mod identity;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OnceCell, broadcast};
use tracing::debug;

use sidebar_types::models::FavouriteRecord;

use crate::context::NavigationContext;
use identity::IdentityCache;
use store::FavouritesDb;

pub use identity::{LogoutSignal, SessionProvider};

/// Sorts after any path segment; closes the prefix range of `list_children`.
pub const PATH_SENTINEL: char = char::MAX;

#[derive(Debug, Error)]
pub enum FavouritesError {
    #[error("favourites database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("favourites database lock poisoned")]
    Poisoned,

    #[error("could not resolve session identity: {0:#}")]
    Session(anyhow::Error),

    #[error("favourites task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Published after a toggle has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavouriteChange {
    pub path: String,
    pub added: bool,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

pub struct FavouritesStore<S, N> {
    location: Location,
    db: OnceCell<Arc<FavouritesDb>>,
    identity: IdentityCache<S>,
    navigation: N,
    changes: broadcast::Sender<FavouriteChange>,
}

impl<S: SessionProvider, N: NavigationContext> FavouritesStore<S, N> {
    /// A store backed by the database file at `path`. The file is opened on
    /// first use.
    pub fn new(path: impl Into<PathBuf>, session: S, navigation: N, logout: LogoutSignal) -> Self {
        Self::with_location(Location::File(path.into()), session, navigation, logout)
    }

    /// A store that lives only as long as the process.
    pub fn in_memory(session: S, navigation: N, logout: LogoutSignal) -> Self {
        Self::with_location(Location::Memory, session, navigation, logout)
    }

    fn with_location(location: Location, session: S, navigation: N, logout: LogoutSignal) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            location,
            db: OnceCell::new(),
            identity: IdentityCache::new(session, logout),
            navigation,
            changes,
        }
    }

    /// Receive a notification after every committed toggle.
    pub fn subscribe(&self) -> broadcast::Receiver<FavouriteChange> {
        self.changes.subscribe()
    }

    pub fn identity(&self) -> &IdentityCache<S> {
        &self.identity
    }

    async fn db(&self) -> Result<Arc<FavouritesDb>, FavouritesError> {
        self.db
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let db = tokio::task::spawn_blocking(move || match location {
                    Location::File(path) => FavouritesDb::open(&path),
                    Location::Memory => FavouritesDb::open_in_memory(),
                })
                .await??;
                Ok::<_, FavouritesError>(Arc::new(db))
            })
            .await
            .cloned()
    }

    /// Database handle plus the `(backend, share)` scope of the current call.
    async fn scope(&self) -> Result<(Arc<FavouritesDb>, String, String), FavouritesError> {
        let db = self.db().await?;
        let backend = self.identity.resolve().await?;
        let share = self.navigation.current_share_id();
        Ok((db, backend, share))
    }

    /// Add `path` if it is not a favourite yet, remove it otherwise.
    /// Returns `true` when the path was added.
    pub async fn toggle(&self, path: &str) -> Result<bool, FavouritesError> {
        let (db, backend, share) = self.scope().await?;
        let record = FavouriteRecord::new(backend, share, path);
        let added = tokio::task::spawn_blocking(move || db.toggle(&record)).await??;

        debug!(path, added, "Favourite toggled");
        let _ = self.changes.send(FavouriteChange {
            path: path.to_string(),
            added,
        });
        Ok(added)
    }

    /// Favourites directly inside the directory `parent_path`.
    pub async fn list_children(&self, parent_path: &str) -> Result<Vec<FavouriteRecord>, FavouritesError> {
        let (db, backend, share) = self.scope().await?;
        let lower = parent_path.to_string();
        let upper = format!("{}{}", parent_path, PATH_SENTINEL);
        let mut records = tokio::task::spawn_blocking(move || {
            db.list_by_parent_range(&backend, &share, &lower, &upper)
        })
        .await??;

        // The range also covers deeper directories sharing the prefix.
        records.retain(|record| record.parent_path() == parent_path);
        Ok(records)
    }

    /// Store `path` as a favourite, replacing any existing record.
    pub async fn add(&self, path: &str) -> Result<(), FavouritesError> {
        let (db, backend, share) = self.scope().await?;
        let record = FavouriteRecord::new(backend, share, path);
        tokio::task::spawn_blocking(move || db.put(&record)).await?
    }

    /// Remove `path`; removing a path that is not a favourite succeeds.
    pub async fn remove(&self, path: &str) -> Result<(), FavouritesError> {
        let (db, backend, share) = self.scope().await?;
        let path = path.to_string();
        tokio::task::spawn_blocking(move || db.delete(&backend, &share, &path)).await?
    }
}
