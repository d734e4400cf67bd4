//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod apps;
pub mod args;
pub mod cache;
pub mod context;
pub mod init;
pub mod poll;
pub mod run;
pub mod status;

pub use args::OutputFormat;
pub use context::CommandContext;

/// Stapler - watch app store listings and announce new versions
#[derive(Parser, Debug)]
#[command(name = "stapler")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "STAPLER_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override settings file location
    #[arg(long, global = true, env = "STAPLER_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "STAPLER_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update the settings file
    Init {
        /// Webhook receiving change notifications (empty to disable)
        #[arg(long)]
        webhook_url: Option<String>,

        /// AppBrain API key for the fallback source (empty to disable)
        #[arg(long)]
        appbrain_key: Option<String>,
    },

    /// Poll on a schedule and deliver notifications until interrupted
    Run,

    /// Poll every watched app once and send any notifications
    Poll,

    /// Watch one or more apps
    Add {
        /// Package ids, e.g. com.example.app
        #[arg(required = true)]
        app_ids: Vec<String>,
    },

    /// Stop watching an app
    Remove {
        app_id: String,
    },

    /// List watched app ids
    List,

    /// Show the last recorded state, most recently changed first
    Latest {
        /// Show a single app
        app_id: Option<String>,
    },

    /// Replace a key in the stored watch configuration
    Set {
        key: String,

        /// JSON value, e.g. '["com.example.app"]'
        value: String,
    },

    /// Show settings and store status
    Status,

    /// Display version information
    Version,

    /// Manage cached source responses
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show store statistics
    Status,

    /// Drop cached source responses (watch list and app history are kept)
    Clear,

    /// Print the store location
    Path,
}
