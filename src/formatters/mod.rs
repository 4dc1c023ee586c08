//! Formatters module - turns source items into destination entries.

pub mod pass_entry;

pub use pass_entry::PassEntryFormatter;

/// Canonical name and body of one destination entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    pub name: String,
    pub body: String,
}
