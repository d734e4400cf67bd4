//! Init command implementation

use std::io::IsTerminal;

use colored::Colorize;
use dialoguer::{Input, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::config::Settings;
use crate::error::{ConfigError, Error, Result};

/// Values given on the command line; anything missing is prompted for when
/// stdin is a terminal
#[derive(Debug, Default)]
pub struct InitArgs {
    pub webhook_url: Option<String>,
    pub appbrain_key: Option<String>,
}

/// Write the settings file, keeping any values already in it
pub fn run(opts: &GlobalOptions, args: InitArgs) -> Result<()> {
    let path = Settings::resolve_path(opts.config_ref())?;

    // `load_from`, not `load_at`: environment overrides stay out of the file
    let mut settings = match Settings::load_from(&path) {
        Ok(settings) => settings,
        Err(Error::Config(ConfigError::NotFound)) => Settings::default(),
        Err(e) => return Err(e),
    };

    let interactive = args.webhook_url.is_none()
        && args.appbrain_key.is_none()
        && std::io::stdin().is_terminal();

    if interactive {
        println!("{}", "Welcome to Stapler!".bold().green());
        println!("Leave a value empty to skip it.\n");
        settings.webhook_url = prompt("Webhook URL for notifications", &settings.webhook_url)?;
        settings.appbrain_api_key = prompt("AppBrain API key", &settings.appbrain_api_key)?;
    } else {
        if let Some(url) = args.webhook_url {
            settings.webhook_url = non_empty(url);
        }
        if let Some(key) = args.appbrain_key {
            settings.appbrain_api_key = non_empty(key);
        }
    }

    settings.validate()?;
    settings.save_to(&path)?;

    println!(
        "{} Configuration saved to: {}",
        "✓".green(),
        path.display()
    );
    println!("\n{}", "Next steps:".bold());
    println!("  {} - Watch an app", "stapler add <APP_ID>".cyan());
    println!("  {} - Poll on a schedule", "stapler run".cyan());

    Ok(())
}

fn prompt(label: &str, current: &Option<String>) -> Result<Option<String>> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .with_initial_text(current.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    Ok(non_empty(value))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
