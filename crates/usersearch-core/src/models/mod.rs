//! Data models for the user directory.
//!
//! This module contains the structures shared by the remote client,
//! the local store and the repositories:
//!
//! - `UserRecord`: a cached directory entry
//! - `AvatarRecord`: raw avatar bytes keyed by their source URL
//! - `UserListResponse`, `RemoteUser`: the search endpoint's wire format
//! - `Page`: a fixed-size window over an ordered result set

pub mod avatar;
pub mod page;
pub mod user;

pub use avatar::AvatarRecord;
pub use page::Page;
pub use user::{RemoteUser, UserListResponse, UserRecord};
