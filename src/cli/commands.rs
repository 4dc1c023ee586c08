//! Command implementations for the bw2pass CLI.
//!
//! Main commands:
//! - sync: unlock, sync and copy every Bitwarden item into pass
//! - preview: render a saved export without touching any store
//! - config: show or initialise the config file

use anyhow::{Context, Result};
use bw2pass::config::{default_config_path, Config};
use bw2pass::destination::pass::STORE_DIR_ENV;
use bw2pass::migrate::{format_items, InvalidItemPolicy, MigrateOptions, MigrationReport};
use bw2pass::{parse_items, BitwardenCli, Migrator, PassEntryFormatter, PassStore, Session};
use bw2pass::{Error, SystemRunner};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Environment variable holding an already unlocked Bitwarden session
const SESSION_ENV: &str = "BW_SESSION";

/// Flags of the `sync` subcommand
pub struct SyncArgs {
    pub dry_run: bool,
    pub no_remote_sync: bool,
    pub strict: bool,
    pub store_dir: Option<PathBuf>,
}

fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&path)?;
    Ok((config, path))
}

fn invalid_item_policy(strict: bool) -> InvalidItemPolicy {
    if strict {
        InvalidItemPolicy::Abort
    } else {
        InvalidItemPolicy::Skip
    }
}

fn print_banner() {
    let rule = "*".repeat(60);
    println!("{}", rule.yellow());
    println!("Note: To ensure a full refresh, logout and login again with:");
    println!("\tbw logout");
    println!("\tbw login");
    println!("{}", rule.yellow());
}

/// Unlock Bitwarden and copy every item into pass
pub fn sync(config_path: Option<PathBuf>, args: SyncArgs) -> Result<()> {
    let (config, _) = load_config(config_path)?;

    let store_dir =
        config.resolve_store_dir(args.store_dir, std::env::var(STORE_DIR_ENV).ok());
    let session = std::env::var(SESSION_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .map(|token| Session::new(token.trim()));

    if session.is_none() {
        print_banner();
    }
    println!(
        "{} {}",
        "Password store:".cyan(),
        store_dir.display().to_string().white().bold()
    );

    let runner = SystemRunner::new();
    let source = BitwardenCli::new(runner)
        .with_program(config.source.program.clone())
        .with_policy(config.unlock_policy())
        .with_session(session)
        .with_logging(config.run.log_commands);
    let destination = PassStore::new(runner, &store_dir)
        .with_program(config.destination.program.clone())
        .with_extension(config.destination.extension.clone());

    let options = MigrateOptions {
        dry_run: args.dry_run,
        remote_sync: !args.no_remote_sync,
        invalid_items: invalid_item_policy(args.strict || config.run.strict),
    };

    let report = match Migrator::new(source, destination).with_options(options).run() {
        Ok(report) => report,
        Err(Error::UnlockTimedOut {
            attempts,
            elapsed_secs,
        }) => {
            anyhow::bail!(
                "Could not unlock Bitwarden ({} attempt(s), {}s). Is `bw login` done?",
                attempts,
                elapsed_secs
            );
        }
        Err(err) => return Err(err).context("Migration failed"),
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!();
    let verb = if report.dry_run {
        "Would write"
    } else {
        "Wrote"
    };
    println!(
        "{} {} entr{} ({} bytes, {} replaced)",
        verb.green().bold(),
        report.written.len().to_string().cyan(),
        if report.written.len() == 1 { "y" } else { "ies" },
        report.bytes_written(),
        report.replaced_count()
    );

    if !report.skipped.is_empty() {
        println!(
            "{} {} invalid item(s):",
            "Skipped".yellow().bold(),
            report.skipped.len()
        );
        for item in &report.skipped {
            println!("\t{} {}", item.label(), format!("({})", item.reason).dimmed());
        }
    }

    if !report.orphaned.is_empty() {
        println!(
            "{}",
            "WARNING: Ignored the following password entries. Possibly deleted from bitwarden?"
                .yellow()
                .bold()
        );
        for name in &report.orphaned {
            println!("\t{}", name);
        }
    }
}

/// Render a saved `bw list items` export to stdout
pub fn preview(config_path: Option<PathBuf>, export: &Path, strict: bool) -> Result<()> {
    let (config, _) = load_config(config_path)?;

    let json = std::fs::read_to_string(export)
        .with_context(|| format!("Cannot read export file: {}", export.display()))?;
    let items = parse_items(&json)?;

    let (entries, skipped) = format_items(&PassEntryFormatter::new(), items);
    if invalid_item_policy(strict || config.run.strict) == InvalidItemPolicy::Abort {
        if let Some(item) = skipped.first() {
            anyhow::bail!("Invalid item {}: {}", item.label(), item.reason);
        }
    }

    for entry in &entries {
        println!(
            "{} {}",
            "==>".cyan().bold(),
            entry.name.white().bold()
        );
        print!("{}", entry.body);
        println!();
    }

    for item in &skipped {
        println!(
            "{} {}: {}",
            "Skipped".yellow(),
            item.label(),
            item.reason
        );
    }

    println!(
        "{} {} entr{}, {} skipped",
        "Previewed".green(),
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        skipped.len()
    );
    Ok(())
}

/// Print the effective configuration, optionally writing the default file
pub fn show_config(config_path: Option<PathBuf>, init: bool) -> Result<()> {
    let (config, path) = load_config(config_path)?;

    if init {
        if path.exists() {
            println!(
                "{} {}",
                "Config already exists:".yellow(),
                path.display()
            );
        } else {
            config.save(&path)?;
            println!("  {} Created {}", "✓".green(), path.display());
        }
    }

    println!("{} {}", "# Config file:".dimmed(), path.display());
    let store_dir = config.resolve_store_dir(None, std::env::var(STORE_DIR_ENV).ok());
    println!(
        "{} {}",
        "# Password store:".dimmed(),
        store_dir.display()
    );
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Cannot serialize config to TOML")?
    );
    Ok(())
}
