//! bw2pass - migrate Bitwarden vault items into a pass password store.
//!
//! Pipeline:
//! - Unlock the vault with `bw` and sync it
//! - Render each item as a flat `Label: value` text block
//! - Replace the matching `pass` entry with the fresh content
//! - Warn about pass entries no Bitwarden item produced
//!
//! Both stores stay opaque: encryption and persistence are left to the
//! `bw` and `pass` tools themselves.

pub mod config;
pub mod destination;
pub mod error;
pub mod formatters;
pub mod item;
pub mod migrate;
pub mod process;
pub mod source;

// Re-export main types
pub use config::Config;
pub use destination::{DestinationStore, PassStore};
pub use error::{Error, FormatError};
pub use formatters::{FormattedEntry, PassEntryFormatter};
pub use item::{parse_items, ItemKind, SourceItem};
pub use migrate::{InvalidItemPolicy, MigrateOptions, MigrationReport, Migrator};
pub use process::{Invocation, ProcessRunner, SystemRunner};
pub use source::{BitwardenCli, Session, SourceStore, UnlockPolicy};
