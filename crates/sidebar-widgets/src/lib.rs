//! Client-side cores of the sidebar widgets.
//!
//! Rendering is left to the host page: every core exposes its visible state
//! through a `tokio::sync::watch` or `broadcast` channel and talks to the
//! backend through small collaborator traits.

pub mod client;
pub mod config;
pub mod context;
pub mod description;
pub mod favourites;
pub mod mention;

pub use client::{ClientError, WidgetClient};
pub use config::WidgetConfig;
pub use context::{NavigationContext, ShareContext};
pub use description::{DescriptionEditor, DescriptionSource, SaveStatus};
pub use favourites::{FavouritesError, FavouritesStore, LogoutSignal, SessionProvider};
pub use mention::{MentionResolver, MentionState, UserDirectory};
