//! Session wiring for command tests: in-memory store, in-memory
//! preferences, and a client pointed at a port nothing listens on.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use usersearch_core::prefs::MemoryPreferences;
use usersearch_core::{ApiClient, DenyList, MemoryStore, SearchSession};

pub fn offline_session(prefs: Arc<MemoryPreferences>) -> SearchSession {
    let remote = ApiClient::with_base_url("http://127.0.0.1:9/search", Duration::from_secs(1))
        .expect("Failed to build offline client");
    let deny_list = DenyList::load_with_default(prefs, "").expect("Failed to load deny-list");
    SearchSession::new(
        Arc::new(remote),
        Arc::new(MemoryStore::new()),
        Arc::new(deny_list),
        NonZeroUsize::new(20).expect("non-zero page size"),
    )
}
