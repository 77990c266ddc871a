//! Read-through repositories over the remote client and the local store.
//!
//! - `UserSearchRepository`: routes each paged query to the network or the
//!   local store, persisting remote results before reading them back
//! - `ImageRepository`: cache-first avatar resolution, populating the
//!   store on a miss

pub mod error;
pub mod images;
pub mod users;

pub use error::RepositoryError;
pub use images::ImageRepository;
pub use users::{PageSource, UserPage, UserSearchRepository};
