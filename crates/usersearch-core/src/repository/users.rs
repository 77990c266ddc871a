use std::sync::Arc;

use tracing::{debug, info};

use crate::api::RemoteClient;
use crate::models::{Page, UserRecord};
use crate::store::LocalStore;

use super::RepositoryError;

/// Where a page of users was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    /// Read directly from the local store.
    Local,
    /// Read back from the local store right after a remote fetch
    /// that returned `fetched` users.
    Remote { fetched: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub page: Page,
    pub source: PageSource,
}

impl UserPage {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True when this page came from a remote search that found nobody.
    pub fn remote_found_nothing(&self) -> bool {
        self.source == PageSource::Remote { fetched: 0 }
    }
}

/// Decides per query whether to go to the network or the local store.
///
/// Page 0 of a non-empty search hits the network, upserts whatever comes
/// back, then reads page 0 from the store so every page is shaped by the
/// same query. Later pages and empty searches are served locally.
pub struct UserSearchRepository {
    remote: Arc<dyn RemoteClient>,
    store: Arc<dyn LocalStore>,
}

impl UserSearchRepository {
    pub fn new(remote: Arc<dyn RemoteClient>, store: Arc<dyn LocalStore>) -> Self {
        Self { remote, store }
    }

    pub async fn query(&self, text: &str, page: Page) -> Result<UserPage, RepositoryError> {
        if text.is_empty() || !page.is_first() {
            return self.read_local(text, page).await;
        }
        self.fetch_then_read(text, page).await
    }

    /// Local-store-only variant used for browsing what is already cached.
    pub async fn query_saved_only(&self, text: &str, page: Page) -> Result<UserPage, RepositoryError> {
        self.read_local(text, page).await
    }

    async fn read_local(&self, text: &str, page: Page) -> Result<UserPage, RepositoryError> {
        let users = self.store.search_users(text, page).await?;
        debug!(text = %text, offset = page.offset, count = users.len(), "Served page from local store");
        Ok(UserPage {
            users,
            page,
            source: PageSource::Local,
        })
    }

    async fn fetch_then_read(&self, text: &str, page: Page) -> Result<UserPage, RepositoryError> {
        let remote_users = self.remote.search_users(text).await?;
        let fetched = remote_users.len();
        info!(text = %text, fetched = fetched, "Fetched users from remote");

        if fetched == 0 {
            return Ok(UserPage {
                users: Vec::new(),
                page,
                source: PageSource::Remote { fetched },
            });
        }

        let records: Vec<UserRecord> = remote_users.into_iter().map(UserRecord::from).collect();
        self.store.upsert_users(records).await?;

        let users = self.store.search_users(text, page).await?;
        Ok(UserPage {
            users,
            page,
            source: PageSource::Remote { fetched },
        })
    }
}
