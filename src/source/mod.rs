//! Source module - access to the password manager being migrated from.

pub mod bitwarden;

pub use bitwarden::{BitwardenCli, UnlockPolicy};

use crate::error::Result;
use std::fmt;

/// Unlocked session token. `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(***)")
    }
}

/// Trait for source stores
pub trait SourceStore {
    /// Block until the vault is unlocked and return a session
    fn unlock(&self) -> Result<Session>;

    /// Pull the latest vault state from the server
    fn sync(&self, session: &Session) -> Result<()>;

    /// Full item list as raw JSON text
    fn list_items(&self, session: &Session) -> Result<String>;
}

impl<S: SourceStore + ?Sized> SourceStore for &S {
    fn unlock(&self) -> Result<Session> {
        (**self).unlock()
    }

    fn sync(&self, session: &Session) -> Result<()> {
        (**self).sync(session)
    }

    fn list_items(&self, session: &Session) -> Result<String> {
        (**self).list_items(session)
    }
}
