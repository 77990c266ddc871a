//! In-memory local store.
//!
//! Same ordering and paging contract as `SqliteStore`, without a disk.
//! Used as the test double for the repositories and for ephemeral hosts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{AvatarRecord, Page, UserRecord};

use super::{LocalStore, StorageError, StoreStats};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, UserRecord>,
    avatars: HashMap<String, Vec<u8>>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StorageError {
        StorageError::Io("memory store lock poisoned".to_string())
    }
}

fn sort_key(user: &UserRecord) -> (&str, &str, i64) {
    (&user.display_name, &user.user_name, user.id)
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn search_users(&self, prefix: &str, page: Page) -> Result<Vec<UserRecord>, StorageError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let mut matching: Vec<&UserRecord> = tables
            .users
            .values()
            .filter(|u| u.matches_prefix(prefix))
            .collect();
        matching.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        Ok(matching
            .into_iter()
            .skip(page.fetch_offset())
            .take(page.fetch_limit())
            .cloned()
            .collect())
    }

    async fn upsert_users(&self, users: Vec<UserRecord>) -> Result<(), StorageError> {
        if users.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        for user in users {
            tables.users.insert(user.id, user);
        }
        tables.last_updated = Some(Utc::now());
        Ok(())
    }

    async fn get_avatar(&self, url: &str) -> Result<Option<AvatarRecord>, StorageError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .avatars
            .get(url)
            .map(|image| AvatarRecord::new(url, image.clone())))
    }

    async fn put_avatar(&self, avatar: AvatarRecord) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables.avatars.insert(avatar.url, avatar.image);
        tables.last_updated = Some(Utc::now());
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(StoreStats {
            users: tables.users.len() as u64,
            avatars: tables.avatars.len() as u64,
            last_updated: tables.last_updated,
        })
    }
}
