use std::sync::Arc;

use tracing::{debug, error};

use crate::api::RemoteClient;
use crate::models::AvatarRecord;
use crate::store::LocalStore;

use super::RepositoryError;

/// Cache-first avatar resolution.
pub struct ImageRepository {
    remote: Arc<dyn RemoteClient>,
    store: Arc<dyn LocalStore>,
}

impl ImageRepository {
    pub fn new(remote: Arc<dyn RemoteClient>, store: Arc<dyn LocalStore>) -> Self {
        Self { remote, store }
    }

    /// Return the avatar stored for `url`, downloading and storing it first
    /// on a miss. The returned value is always the stored copy.
    pub async fn resolve_image(&self, url: &str) -> Result<AvatarRecord, RepositoryError> {
        if let Some(avatar) = self.store.get_avatar(url).await? {
            debug!(url = url, "Avatar cache hit");
            return Ok(avatar);
        }

        debug!(url = url, "Avatar cache miss, fetching");
        let image = self.remote.fetch_image(url).await?;
        self.store.put_avatar(AvatarRecord::new(url, image)).await?;

        match self.store.get_avatar(url).await? {
            Some(avatar) => Ok(avatar),
            None => {
                error!(url = url, "Avatar missing immediately after a successful write");
                Err(RepositoryError::MissingAfterWrite(url.to_string()))
            }
        }
    }
}
