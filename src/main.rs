//! Stapler - watches app store listings and announces version changes

use clap::Parser;

mod cache;
mod cli;
mod config;
mod error;
mod models;
mod notify;
mod output;
mod poll;
mod source;
mod store;
mod tracker;
mod watch;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init {
            webhook_url,
            appbrain_key,
        } => cli::init::run(
            &opts,
            cli::init::InitArgs {
                webhook_url,
                appbrain_key,
            },
        ),
        Commands::Run => cli::run::run(&opts).await,
        Commands::Poll => cli::poll::run(&opts).await,
        Commands::Add { app_ids } => cli::apps::add(&opts, &app_ids).await,
        Commands::Remove { app_id } => cli::apps::remove(&opts, &app_id).await,
        Commands::List => cli::apps::list(&opts).await,
        Commands::Latest { app_id } => cli::apps::latest(&opts, app_id.as_deref()).await,
        Commands::Set { key, value } => cli::apps::set(&opts, &key, &value).await,
        Commands::Status => cli::status::run(&opts).await,
        Commands::Version => {
            println!("stapler version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts).await,
            CacheCommands::Clear => cli::cache::clear(&opts).await,
            CacheCommands::Path => cli::cache::path(&opts),
        },
    }
}

/// `info` by default, `debug` with `--debug`; `RUST_LOG` overrides both
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}
