//! Local persistent store for users and avatar images.
//!
//! This module provides the `LocalStore` capability trait plus two
//! implementations:
//! - `SqliteStore`: the on-disk store (users table + avatars blob table)
//! - `MemoryStore`: an in-memory store with the identical contract, for tests
//!
//! Users are range-scanned by name prefix and paged; avatars are point
//! lookups by URL. Both writes are upserts.

pub mod error;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{AvatarRecord, Page, UserRecord};

pub use error::StorageError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Row counts and freshness of the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub users: u64,
    pub avatars: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Users whose display name or user name starts with `prefix`
    /// (case-insensitive), ordered by display name, user name, then id.
    /// An empty prefix matches every row.
    async fn search_users(&self, prefix: &str, page: Page) -> Result<Vec<UserRecord>, StorageError>;

    /// Insert or overwrite `users` by id as one atomic unit.
    async fn upsert_users(&self, users: Vec<UserRecord>) -> Result<(), StorageError>;

    /// Point lookup; `Ok(None)` when nothing is stored for `url`.
    async fn get_avatar(&self, url: &str) -> Result<Option<AvatarRecord>, StorageError>;

    /// Insert or overwrite the avatar stored for `avatar.url`.
    async fn put_avatar(&self, avatar: AvatarRecord) -> Result<(), StorageError>;

    async fn stats(&self) -> Result<StoreStats, StorageError>;
}
