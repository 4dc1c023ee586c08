//! Error types for the migration pipeline.

use crate::process::ProcessError;
use thiserror::Error;

/// Reasons a single source item cannot be turned into a pass entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unrecognized item type: {0}")]
    UnknownType(i64),

    #[error("missing `{field}` in {section} data")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("vault still locked after {attempts} unlock attempt(s) in {elapsed_secs}s")]
    UnlockTimedOut { attempts: u32, elapsed_secs: u64 },

    #[error("cannot parse item list: {0}")]
    ItemList(#[source] serde_json::Error),

    #[error("invalid item #{index} ({label}): {reason}")]
    InvalidItem {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
