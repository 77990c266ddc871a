//! Core library for usersearch.
//!
//! Incremental search over a remote user directory, served through a local
//! read-through cache:
//!
//! - `api`: HTTP client for the search and avatar endpoints
//! - `store`: persistent user/avatar storage (SQLite) and an in-memory double
//! - `repository`: cache-vs-network routing for users and avatars
//! - `denylist`: remembered searches that return nothing
//! - `session`: caller-side wiring of the deny-list in front of the repositories

pub mod api;
pub mod config;
pub mod denylist;
pub mod models;
pub mod prefs;
pub mod repository;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, NetworkError, RemoteClient};
pub use config::Config;
pub use denylist::{DenyList, DenyListSource};
pub use models::{AvatarRecord, Page, RemoteUser, UserRecord};
pub use repository::{ImageRepository, RepositoryError, UserSearchRepository};
pub use session::{SearchOutcome, SearchSession};
pub use store::{LocalStore, MemoryStore, SqliteStore, StorageError, StoreStats};
