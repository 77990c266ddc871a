//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::api::{NetworkError, RemoteClient};
use crate::models::{AvatarRecord, Page, RemoteUser, UserRecord};
use crate::store::{LocalStore, StorageError, StoreStats};

pub fn remote_user(id: i64, display_name: &str, user_name: &str) -> RemoteUser {
    RemoteUser {
        id: Some(id),
        display_name: Some(display_name.to_string()),
        user_name: Some(user_name.to_string()),
        avatar_url: Some(format!("https://avatars.example.com/{}.png", id)),
    }
}

/// Remote client that answers every search with the same users and every
/// image request with the same bytes, counting calls.
#[derive(Default)]
pub struct FakeRemote {
    users: Vec<RemoteUser>,
    image: Vec<u8>,
    fail: bool,
    search_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn with_users(users: Vec<RemoteUser>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            image,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn search_users(&self, _text: &str) -> Result<Vec<RemoteUser>, NetworkError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NetworkError::Transport("connection refused".to_string()));
        }
        Ok(self.users.clone())
    }

    async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, NetworkError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NetworkError::Transport("connection refused".to_string()));
        }
        Ok(self.image.clone())
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

impl FailingStore {
    fn fault() -> StorageError {
        StorageError::Io("disk unavailable".to_string())
    }
}

#[async_trait]
impl LocalStore for FailingStore {
    async fn search_users(&self, _prefix: &str, _page: Page) -> Result<Vec<UserRecord>, StorageError> {
        Err(Self::fault())
    }

    async fn upsert_users(&self, _users: Vec<UserRecord>) -> Result<(), StorageError> {
        Err(Self::fault())
    }

    async fn get_avatar(&self, _url: &str) -> Result<Option<AvatarRecord>, StorageError> {
        Err(Self::fault())
    }

    async fn put_avatar(&self, _avatar: AvatarRecord) -> Result<(), StorageError> {
        Err(Self::fault())
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        Err(Self::fault())
    }
}

/// Store that accepts avatar writes but never returns them.
pub struct ForgetfulStore;

#[async_trait]
impl LocalStore for ForgetfulStore {
    async fn search_users(&self, _prefix: &str, _page: Page) -> Result<Vec<UserRecord>, StorageError> {
        Ok(Vec::new())
    }

    async fn upsert_users(&self, _users: Vec<UserRecord>) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_avatar(&self, _url: &str) -> Result<Option<AvatarRecord>, StorageError> {
        Ok(None)
    }

    async fn put_avatar(&self, _avatar: AvatarRecord) -> Result<(), StorageError> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        Ok(StoreStats::default())
    }
}
