//! Destination module - the file-based password store being written to.

pub mod pass;

pub use pass::PassStore;

use crate::error::Result;

/// Trait for destination stores.
///
/// Entries are addressed only by name; their stored content is opaque.
pub trait DestinationStore {
    /// Names of all entries currently in the store
    fn list_names(&self) -> Result<Vec<String>>;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Create entry `name` with the given multi-line content.
    /// Returns whatever the underlying tool printed.
    fn insert(&self, name: &str, content: &str) -> Result<String>;

    /// Delete entry `name`. Deleting a missing entry is not an error.
    fn remove(&self, name: &str) -> Result<()>;
}

impl<D: DestinationStore + ?Sized> DestinationStore for &D {
    fn list_names(&self) -> Result<Vec<String>> {
        (**self).list_names()
    }

    fn exists(&self, name: &str) -> Result<bool> {
        (**self).exists(name)
    }

    fn insert(&self, name: &str, content: &str) -> Result<String> {
        (**self).insert(name, content)
    }

    fn remove(&self, name: &str) -> Result<()> {
        (**self).remove(name)
    }
}
