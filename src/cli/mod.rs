pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedwell")]
#[command(about = "Fetch, cache and normalize RSS/Atom feeds", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/feedwell/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep cache and rate-limit state in memory instead of SQLite
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one or more feeds through the conditional cache
    Fetch {
        /// Feed URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Bypass the cache entirely
        #[arg(long)]
        no_cache: bool,

        /// Ignore cached validators and refetch
        #[arg(long)]
        refresh: bool,

        /// Client identifier used for rate limiting
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Parse a feed document from a local file
    Parse {
        /// Path to an RSS or Atom file
        path: PathBuf,
    },
    /// Print the cache key derived for a URL
    Key {
        /// Feed URL
        url: String,
    },
    /// Show the rate-limit state of a client
    Limit {
        /// Client identifier
        client: String,
    },
}
