//! bw2pass CLI - copy Bitwarden items into pass.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bw2pass={}", log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Sync {
            dry_run,
            no_remote_sync,
            strict,
            store_dir,
        } => cli::commands::sync(
            cli.config,
            cli::commands::SyncArgs {
                dry_run,
                no_remote_sync,
                strict,
                store_dir,
            },
        ),
        Commands::Preview { export, strict } => cli::commands::preview(cli.config, &export, strict),
        Commands::Config { init } => cli::commands::show_config(cli.config, init),
    }
}
