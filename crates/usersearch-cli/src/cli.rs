//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "usersearch", version, about = "Search a user directory through a local cache")]
pub struct Cli {
    /// Debug-level logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Override the search endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search users by name prefix (page 0 goes to the network)
    Search {
        text: String,
        /// Zero-based page offset
        #[arg(short, long, default_value_t = 0)]
        page: usize,
        /// Keep paging until the results run out
        #[arg(long, conflicts_with = "page")]
        all: bool,
        /// Resolve each result's avatar through the image cache
        #[arg(long)]
        avatars: bool,
    },
    /// Browse cached users without searching again
    Saved {
        #[arg(default_value = "")]
        text: String,
        #[arg(short, long, default_value_t = 0)]
        page: usize,
    },
    /// Resolve one avatar image through the cache
    Avatar {
        url: String,
        /// Write the image bytes to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Show local cache statistics
    Stats,
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
    /// Inspect or edit the deny-list
    Deny {
        #[command(subcommand)]
        action: DenyAction,
    },
    /// Line-by-line incremental search
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum DenyAction {
    /// Print every entry
    List,
    /// Add a search text
    Add { text: String },
    /// Remove a search text
    Remove { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["usersearch", "search", "ann", "--page", "2", "--avatars"]).unwrap();
        match cli.command {
            Command::Search { text, page, all, avatars } => {
                assert_eq!(text, "ann");
                assert_eq!(page, 2);
                assert!(!all);
                assert!(avatars);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_page() {
        assert!(Cli::try_parse_from(["usersearch", "search", "ann", "--all", "--page", "1"]).is_err());
    }

    #[test]
    fn test_saved_defaults_to_everything() {
        let cli = Cli::try_parse_from(["usersearch", "saved"]).unwrap();
        assert!(matches!(cli.command, Command::Saved { ref text, page: 0 } if text.is_empty()));
    }

    #[test]
    fn test_config_save_flag() {
        let cli = Cli::try_parse_from(["usersearch", "config", "--save"]).unwrap();
        assert!(matches!(cli.command, Command::Config { save: true }));
    }

    #[test]
    fn test_deny_add() {
        let cli = Cli::try_parse_from(["usersearch", "-v", "deny", "add", "xyz"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Deny { action: DenyAction::Add { ref text } } if text == "xyz"));
    }
}
