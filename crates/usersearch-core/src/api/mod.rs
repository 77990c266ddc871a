//! REST API client module for the user directory service.
//!
//! This module provides the `ApiClient` for issuing prefix searches and
//! downloading avatar images, and the `RemoteClient` capability trait the
//! repositories depend on. Every call is a single attempt; retry policy,
//! if any, belongs to the caller.

pub mod client;
pub mod error;

use async_trait::async_trait;

use crate::models::RemoteUser;

pub use client::ApiClient;
pub use error::NetworkError;

/// Remote side of the read-through cache.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Search the directory for users whose name starts with `text`.
    /// An empty list is a valid answer.
    async fn search_users(&self, text: &str) -> Result<Vec<RemoteUser>, NetworkError>;

    /// Download the raw bytes behind `url`.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}
