use thiserror::Error;

use crate::api::NetworkError;
use crate::store::StorageError;

/// Failures surfaced by the repositories. Network and storage faults are
/// passed through unchanged so callers can tell them apart.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Avatar for {0} was written but could not be read back")]
    MissingAfterWrite(String),
}

impl RepositoryError {
    /// True when the failure came from the remote side rather than local storage.
    pub fn is_network(&self) -> bool {
        matches!(self, RepositoryError::Network(_))
    }
}
