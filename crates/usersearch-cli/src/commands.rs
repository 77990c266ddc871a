//! Subcommand implementations.
//!
//! Every command runs against one `SearchSession` and ends with
//! `suspend()`, so deny-list changes made during the run are persisted.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::warn;

use usersearch_core::repository::RepositoryError;
use usersearch_core::utils::{age_display, format_bytes, truncate_string};
use usersearch_core::{Config, Page, SearchOutcome, SearchSession, UserRecord};

use crate::cli::DenyAction;

/// Maximum concurrent avatar downloads for `search --avatars`.
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// Width of the name column in result listings.
const LABEL_WIDTH: usize = 48;

/// Message for a failed query, separating connectivity from local storage problems.
pub fn describe_failure(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Network(e) if e.is_connectivity() => {
            format!("Could not reach the user directory: {}", e)
        }
        _ if err.is_network() => format!("User directory request failed: {}", err),
        RepositoryError::Storage(e) => format!("Local cache error: {}", e),
        _ => format!("Internal cache error: {}", err),
    }
}

pub fn print_users(users: &[UserRecord], first_row: usize) {
    for (i, user) in users.iter().enumerate() {
        println!(
            "{:>5}  {:<width$}  #{}",
            first_row + i + 1,
            truncate_string(&user.label(), LABEL_WIDTH),
            user.id,
            width = LABEL_WIDTH
        );
    }
}

/// Print one page outcome. Returns the users shown.
pub fn print_outcome(text: &str, page: Page, outcome: &SearchOutcome) -> usize {
    match outcome {
        SearchOutcome::Found(users) => {
            print_users(users, page.fetch_offset());
            users.len()
        }
        SearchOutcome::Empty if page.is_first() => {
            println!("No users found for \"{}\"", text);
            0
        }
        SearchOutcome::Empty => {
            println!("No more results");
            0
        }
        SearchOutcome::Denied => {
            println!("No users found for \"{}\" (remembered from an earlier search)", text);
            0
        }
    }
}

pub async fn search(session: &SearchSession, text: &str, offset: usize, all: bool, avatars: bool) -> Result<()> {
    let mut page = session.page(offset);
    let mut shown: Vec<UserRecord> = Vec::new();

    loop {
        let outcome = session
            .search(text, page)
            .await
            .map_err(|e| anyhow::anyhow!(describe_failure(&e)))?;
        let count = print_outcome(text, page, &outcome);
        shown.extend_from_slice(outcome.users());

        if !all || count == 0 {
            break;
        }
        page = page.next();
    }

    if avatars && !shown.is_empty() {
        resolve_avatars(session, &shown).await;
    }
    Ok(())
}

async fn resolve_avatars(session: &SearchSession, users: &[UserRecord]) {
    let results: Vec<_> = stream::iter(users.iter().filter(|u| !u.avatar_url.is_empty()))
        .map(|user| async move { (user, session.avatar(&user.avatar_url).await) })
        .buffer_unordered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

    println!();
    for (user, result) in results {
        match result {
            Ok(avatar) => println!("  {:<24} {}", truncate_string(&user.display_name, 24), format_bytes(avatar.len())),
            Err(e) => {
                warn!(url = %user.avatar_url, error = %e, "Avatar resolution failed");
                println!("  {:<24} unavailable ({})", truncate_string(&user.display_name, 24), describe_failure(&e));
            }
        }
    }
}

pub async fn saved(session: &SearchSession, text: &str, offset: usize) -> Result<()> {
    let page = session.page(offset);
    let outcome = session
        .browse_saved(text, page)
        .await
        .map_err(|e| anyhow::anyhow!(describe_failure(&e)))?;
    match outcome {
        SearchOutcome::Found(ref users) => print_users(users, page.fetch_offset()),
        _ if page.is_first() => println!("Nothing cached yet"),
        _ => println!("No more results"),
    }
    Ok(())
}

pub async fn avatar(session: &SearchSession, url: &str, output: Option<&Path>) -> Result<()> {
    let avatar = session
        .avatar(url)
        .await
        .map_err(|e| anyhow::anyhow!(describe_failure(&e)))?;

    match output {
        Some(path) => {
            std::fs::write(path, &avatar.image)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} to {}", format_bytes(avatar.len()), path.display());
        }
        None => println!("{} ({})", avatar.url, format_bytes(avatar.len())),
    }
    Ok(())
}

pub async fn stats(session: &SearchSession, config: &Config) -> Result<()> {
    let stats = session
        .stats()
        .await
        .map_err(|e| anyhow::anyhow!(describe_failure(&e)))?;

    let updated = stats
        .last_updated
        .map(|at| age_display(at, Utc::now()))
        .unwrap_or_else(|| "never".to_string());

    println!("Database:     {}", config.database_path()?.display());
    println!("Users:        {}", stats.users);
    println!("Avatars:      {}", stats.avatars);
    println!("Last updated: {}", updated);
    println!("Deny-list:    {} entries", session.deny_list().len());
    Ok(())
}

/// Print the effective configuration. With `save_to`, write `file_config`
/// (the file values without environment or `--api-url` overrides) there.
pub fn config(config: &Config, file_config: &Config, save_to: Option<&Path>) -> Result<()> {
    match Config::config_path() {
        Ok(path) => println!("Config file:  {}", path.display()),
        Err(e) => println!("Config file:  unavailable ({})", e),
    }
    println!("API URL:      {}", config.api_base_url);
    println!("Page size:    {}", config.page_size());
    println!("Timeout:      {}s", config.request_timeout_secs);
    println!("Database:     {}", config.database_path()?.display());
    println!("Preferences:  {}", config.preferences_path()?.display());

    if let Some(path) = save_to {
        file_config.save_to(path).context("Failed to save config")?;
        println!("Saved file settings to {} (overrides not included)", path.display());
    }
    Ok(())
}

pub fn deny(session: &SearchSession, action: &DenyAction) -> Result<()> {
    let deny_list = session.deny_list();
    match action {
        DenyAction::List => {
            for entry in deny_list.entries() {
                println!("{}", entry);
            }
        }
        DenyAction::Add { text } => {
            if text.is_empty() {
                anyhow::bail!("Cannot add an empty search text");
            }
            deny_list.record_zero_result(text);
            println!("Added \"{}\"", text.to_lowercase());
        }
        DenyAction::Remove { text } => {
            if deny_list.remove(text) {
                println!("Removed \"{}\"", text.to_lowercase());
            } else {
                println!("\"{}\" was not on the deny-list", text);
            }
        }
    }
    Ok(())
}
