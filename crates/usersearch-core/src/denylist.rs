//! Deny-list of search texts known to return no remote results.
//!
//! Loaded once per session from the preference store, falling back to a
//! bundled newline-delimited list. Mutated in memory as zero-result
//! searches are observed and written back only by `save()`, which the
//! host calls when the session is suspended. Entries added after the
//! last `save()` are lost if the process dies first.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use tracing::{debug, info};

use crate::prefs::PreferenceStore;

/// Preference key holding the persisted list.
pub const DENY_LIST_KEY: &str = "denyList";

/// Default entries used when nothing has been persisted yet.
pub const BUNDLED_DENY_LIST: &str = include_str!("../resources/denylist.txt");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyListSource {
    Persisted,
    Bundled,
}

pub struct DenyList {
    entries: RwLock<HashSet<String>>,
    prefs: Arc<dyn PreferenceStore>,
    source: DenyListSource,
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
}

impl DenyList {
    /// Load from `prefs`, or from the bundled list if no entry exists.
    pub fn load(prefs: Arc<dyn PreferenceStore>) -> Result<Self> {
        Self::load_with_default(prefs, BUNDLED_DENY_LIST)
    }

    /// Load from `prefs`, or from `default_list` if no entry exists.
    /// Nothing is written to `prefs` here.
    pub fn load_with_default(prefs: Arc<dyn PreferenceStore>, default_list: &str) -> Result<Self> {
        let (entries, source) = match prefs.string_list(DENY_LIST_KEY)? {
            Some(persisted) => {
                let entries: HashSet<String> = persisted
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| normalize(s))
                    .collect();
                (entries, DenyListSource::Persisted)
            }
            None => (Self::parse_default(default_list), DenyListSource::Bundled),
        };
        info!(count = entries.len(), source = ?source, "Loaded deny-list");

        Ok(Self {
            entries: RwLock::new(entries),
            prefs,
            source,
        })
    }

    /// Split a newline-delimited list, dropping empty lines. Only a
    /// trailing `\r` is stripped; entries are otherwise kept verbatim,
    /// the same as persisted entries and looked-up text.
    pub fn parse_default(text: &str) -> HashSet<String> {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(normalize)
            .collect()
    }

    pub fn source(&self) -> DenyListSource {
        self.source
    }

    /// Case-insensitive exact match.
    pub fn contains(&self, text: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize(text))
    }

    pub fn record_zero_result(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let inserted = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(text));
        if inserted {
            debug!(text = %text, "Added to deny-list");
        }
    }

    pub fn remove(&self, text: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize(text))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current entries, sorted.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        entries.sort();
        entries
    }

    /// Write the current set to the preference store.
    pub fn save(&self) -> Result<()> {
        let entries = self.entries();
        self.prefs.set_string_list(DENY_LIST_KEY, &entries)?;
        info!(count = entries.len(), "Saved deny-list");
        Ok(())
    }
}
