//! CLI definitions and command implementations for bw2pass.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bw2pass - copy Bitwarden items into a pass password store
#[derive(Parser)]
#[command(name = "bw2pass")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/bw2pass/bw2pass.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unlock Bitwarden, sync it and replace matching pass entries
    Sync {
        /// Show what would be written without touching the store
        #[arg(long)]
        dry_run: bool,

        /// Skip `bw sync` and use the locally cached vault
        #[arg(long)]
        no_remote_sync: bool,

        /// Abort before writing anything if any item is invalid
        #[arg(long)]
        strict: bool,

        /// Password store directory (overrides PASSWORD_STORE_DIR)
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Print the pass entries a saved `bw list items` export would produce
    Preview {
        /// JSON file written by `bw list items`
        export: PathBuf,

        /// Fail on the first invalid item instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}
