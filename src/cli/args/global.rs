//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global flags, captured once in `main` and handed to every command.
///
/// Precedence is CLI flag > environment variable > settings file > default;
/// this struct holds the CLI/env layer, the settings file is read by
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub format: OutputFormat,

    /// Custom settings file path (defaults to ~/.stapler/config.yaml)
    pub config: Option<String>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }
}
