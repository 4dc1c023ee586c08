//! Migration pipeline: unlock -> sync -> list -> format -> replace entries
//! -> report orphans.

use crate::destination::DestinationStore;
use crate::error::{Error, Result};
use crate::formatters::{FormattedEntry, PassEntryFormatter};
use crate::item::{parse_items, DecodedItem};
use crate::source::SourceStore;
use std::collections::HashSet;

/// What to do with items that cannot be decoded or formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidItemPolicy {
    /// Report the item and carry on with the rest
    #[default]
    Skip,
    /// Refuse to touch the destination if any item is invalid
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Format and diff only; never remove or insert
    pub dry_run: bool,
    /// Ask the source to pull from its server before listing
    pub remote_sync: bool,
    pub invalid_items: InvalidItemPolicy,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            remote_sync: true,
            invalid_items: InvalidItemPolicy::Skip,
        }
    }
}

/// One entry written (or, in a dry run, that would be written)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenEntry {
    pub name: String,
    pub bytes: usize,
    /// An entry with the same name existed and was deleted first
    pub replaced: bool,
}

/// A source item left out of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position in the source list
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub reason: String,
}

impl SkippedItem {
    /// Best human readable handle for the item
    pub fn label(&self) -> String {
        match (&self.name, &self.id) {
            (Some(name), Some(id)) => format!("{} [{}]", name, id),
            (Some(name), None) => name.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => format!("#{}", self.index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub written: Vec<WrittenEntry>,
    pub skipped: Vec<SkippedItem>,
    /// Entries present before the run that no source item produced
    pub orphaned: Vec<String>,
}

impl MigrationReport {
    pub fn bytes_written(&self) -> usize {
        self.written.iter().map(|entry| entry.bytes).sum()
    }

    pub fn replaced_count(&self) -> usize {
        self.written.iter().filter(|entry| entry.replaced).count()
    }
}

/// Format every decoded item, splitting successes from failures.
/// Source order is preserved in both lists.
pub fn format_items(
    formatter: &PassEntryFormatter,
    items: Vec<DecodedItem>,
) -> (Vec<FormattedEntry>, Vec<SkippedItem>) {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for (index, decoded) in items.into_iter().enumerate() {
        match decoded {
            Ok(item) => match formatter.format(&item) {
                Ok(entry) => entries.push(entry),
                Err(err) => skipped.push(SkippedItem {
                    index,
                    id: Some(item.id),
                    name: Some(item.name),
                    reason: err.to_string(),
                }),
            },
            Err(raw) => skipped.push(SkippedItem {
                index: raw.index,
                id: raw.id,
                name: raw.name,
                reason: raw.reason,
            }),
        }
    }

    (entries, skipped)
}

/// Copies every source item into the destination store
pub struct Migrator<S, D> {
    source: S,
    destination: D,
    formatter: PassEntryFormatter,
    options: MigrateOptions,
}

impl<S: SourceStore, D: DestinationStore> Migrator<S, D> {
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            formatter: PassEntryFormatter::new(),
            options: MigrateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MigrateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> MigrateOptions {
        self.options
    }

    pub fn run(&self) -> Result<MigrationReport> {
        tracing::info!("Unlocking bitwarden");
        let session = self.source.unlock()?;

        if self.options.remote_sync {
            tracing::info!("Syncing bitwarden passwords");
            self.source.sync(&session)?;
        }

        tracing::info!("Listing bitwarden items");
        let json = self.source.list_items(&session)?;
        let items = parse_items(&json)?;
        tracing::debug!("Parsed {} item(s)", items.len());

        self.apply(items)
    }

    fn apply(&self, items: Vec<DecodedItem>) -> Result<MigrationReport> {
        let (entries, skipped) = format_items(&self.formatter, items);

        if self.options.invalid_items == InvalidItemPolicy::Abort {
            if let Some(item) = skipped.into_iter().next() {
                return Err(Error::InvalidItem {
                    index: item.index,
                    label: item.label(),
                    reason: item.reason,
                });
            }
            return self.write_entries(entries, Vec::new());
        }

        for item in &skipped {
            tracing::warn!("Skipping item {}: {}", item.label(), item.reason);
        }
        self.write_entries(entries, skipped)
    }

    fn write_entries(
        &self,
        entries: Vec<FormattedEntry>,
        skipped: Vec<SkippedItem>,
    ) -> Result<MigrationReport> {
        let existing = self.destination.list_names()?;
        let dry_run = self.options.dry_run;

        let mut written = Vec::with_capacity(entries.len());
        let mut produced: HashSet<String> = HashSet::with_capacity(entries.len());

        for entry in entries {
            if !produced.insert(entry.name.clone()) {
                tracing::warn!(
                    "Entry {} is produced by more than one item, the later one wins",
                    entry.name
                );
            }

            let replaced = self.destination.exists(&entry.name)?;
            let bytes = entry.body.len();

            if dry_run {
                if replaced {
                    tracing::info!("Would replace existing pass entry {}", entry.name);
                }
                tracing::info!("Would insert {} bytes into {}", bytes, entry.name);
            } else {
                if replaced {
                    self.destination.remove(&entry.name)?;
                    tracing::info!("Removed existing pass entry {}", entry.name);
                }
                let response = self.destination.insert(&entry.name, &entry.body)?;
                tracing::debug!("pass: {}", response.trim());
                tracing::info!("Inserted {} bytes into {}", bytes, entry.name);
            }

            written.push(WrittenEntry {
                name: entry.name,
                bytes,
                replaced,
            });
        }

        let orphaned = existing
            .into_iter()
            .filter(|name| !produced.contains(name))
            .collect();

        Ok(MigrationReport {
            dry_run,
            written,
            skipped,
            orphaned,
        })
    }
}
