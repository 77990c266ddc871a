//! Search session: the caller-side owner of the deny-list.
//!
//! The repositories know nothing about the deny-list. The session checks
//! it before any non-empty search and teaches it whenever a first-page
//! remote search comes back empty. `suspend()` persists it; hosts call
//! that when they are about to be backgrounded or torn down.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::api::{ApiClient, RemoteClient};
use crate::config::Config;
use crate::denylist::DenyList;
use crate::models::{AvatarRecord, Page, UserRecord};
use crate::prefs::JsonFilePreferences;
use crate::repository::{ImageRepository, RepositoryError, UserPage, UserSearchRepository};
use crate::store::{LocalStore, SqliteStore, StoreStats};

/// Result of a search, keeping "nothing found" and "not even tried"
/// apart from failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<UserRecord>),
    /// The query ran and matched nobody (or the page is past the end).
    Empty,
    /// The text is on the deny-list; no I/O was performed.
    Denied,
}

impl SearchOutcome {
    fn from_page(page: UserPage) -> Self {
        if page.is_empty() {
            SearchOutcome::Empty
        } else {
            SearchOutcome::Found(page.users)
        }
    }

    pub fn users(&self) -> &[UserRecord] {
        match self {
            SearchOutcome::Found(users) => users,
            SearchOutcome::Empty | SearchOutcome::Denied => &[],
        }
    }
}

pub struct SearchSession {
    users: UserSearchRepository,
    images: ImageRepository,
    store: Arc<dyn LocalStore>,
    deny_list: Arc<DenyList>,
    page_size: NonZeroUsize,
}

impl SearchSession {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        store: Arc<dyn LocalStore>,
        deny_list: Arc<DenyList>,
        page_size: NonZeroUsize,
    ) -> Self {
        Self {
            users: UserSearchRepository::new(remote.clone(), store.clone()),
            images: ImageRepository::new(remote, store.clone()),
            store,
            deny_list,
            page_size,
        }
    }

    /// Wire up the production collaborators described by `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let remote = ApiClient::with_base_url(&config.api_base_url, config.request_timeout())?;
        let database_path = config.database_path()?;
        let preferences_path = config.preferences_path()?;

        // Creates files and runs the schema, so it goes to the blocking pool
        // like every other store operation.
        let (store, deny_list) = tokio::task::spawn_blocking(move || -> Result<_> {
            let store = SqliteStore::open(database_path)?;
            let deny_list = DenyList::load(Arc::new(JsonFilePreferences::new(preferences_path)))?;
            Ok((store, deny_list))
        })
        .await??;

        Ok(Self::new(
            Arc::new(remote),
            Arc::new(store),
            Arc::new(deny_list),
            config.page_size(),
        ))
    }

    pub fn first_page(&self) -> Page {
        Page::first(self.page_size)
    }

    pub fn page(&self, offset: usize) -> Page {
        Page::new(offset, self.page_size)
    }

    pub fn deny_list(&self) -> &DenyList {
        &self.deny_list
    }

    pub async fn search(&self, text: &str, page: Page) -> Result<SearchOutcome, RepositoryError> {
        if !text.is_empty() && self.deny_list.contains(text) {
            debug!(text = %text, "Search text is deny-listed");
            return Ok(SearchOutcome::Denied);
        }

        let result = self.users.query(text, page).await?;
        if result.remote_found_nothing() {
            info!(text = %text, "Remote search found nothing, remembering");
            self.deny_list.record_zero_result(text);
        }
        Ok(SearchOutcome::from_page(result))
    }

    /// Browse what is already cached without searching again.
    pub async fn browse_saved(&self, text: &str, page: Page) -> Result<SearchOutcome, RepositoryError> {
        let result = self.users.query_saved_only(text, page).await?;
        Ok(SearchOutcome::from_page(result))
    }

    pub async fn avatar(&self, url: &str) -> Result<AvatarRecord, RepositoryError> {
        self.images.resolve_image(url).await
    }

    pub async fn stats(&self) -> Result<StoreStats, RepositoryError> {
        Ok(self.store.stats().await?)
    }

    /// Persist session state ahead of suspension.
    pub fn suspend(&self) -> Result<()> {
        self.deny_list.save()
    }
}
