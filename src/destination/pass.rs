//! Pass destination - entries are `<name>.gpg` files under the store dir.
//!
//! Inserting goes through `pass insert -m` so the tool does the encryption;
//! listing, existence checks and removal work on the directory directly.

use super::DestinationStore;
use crate::error::Result;
use crate::process::{Invocation, ProcessRunner};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default binary name
pub const DEFAULT_PROGRAM: &str = "pass";

/// Default entry file extension
pub const DEFAULT_EXTENSION: &str = "gpg";

/// Environment variable read by `pass` for the store location
pub const STORE_DIR_ENV: &str = "PASSWORD_STORE_DIR";

/// pass client
pub struct PassStore<R> {
    runner: R,
    program: String,
    store_dir: PathBuf,
    extension: String,
}

impl<R: ProcessRunner> PassStore<R> {
    pub fn new(runner: R, store_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: DEFAULT_PROGRAM.to_string(),
            store_dir: store_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Backing file of entry `name`
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.store_dir.join(format!("{}.{}", name, self.extension))
    }
}

impl<R: ProcessRunner> DestinationStore for PassStore<R> {
    fn list_names(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.store_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let suffix = format!(".{}", self.extension);
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            // Follows symlinks, like `exists`
            if !entry.path().is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(&suffix) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.entry_path(name).is_file())
    }

    fn insert(&self, name: &str, content: &str) -> Result<String> {
        // Body is not logged; it holds the secrets
        let invocation = Invocation::new(&self.program)
            .arg("insert")
            .arg("-m")
            .arg(name)
            .input(content)
            .env(STORE_DIR_ENV, self.store_dir.to_string_lossy())
            .quiet();
        Ok(self.runner.run_checked(&invocation)?)
    }

    fn remove(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.entry_path(name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, ProcessError};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Invocation>>,
    }

    impl ProcessRunner for RecordingRunner {
        fn run(
            &self,
            invocation: &Invocation,
        ) -> std::result::Result<CommandOutput, ProcessError> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(CommandOutput::ok(""))
        }
    }

    #[test]
    fn test_list_names_filters_and_sorts() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        std::fs::write(dir.join("zeta-login-aaaa.gpg"), b"x")?;
        std::fs::write(dir.join("alpha-note-bbbb.gpg"), b"x")?;
        std::fs::write(dir.join(".gpg-id"), b"ABCDEF")?;
        std::fs::write(dir.join("readme.txt"), b"x")?;
        std::fs::create_dir(dir.join("folder.gpg"))?;

        let store = PassStore::new(RecordingRunner::default(), dir);
        assert_eq!(
            store.list_names()?,
            vec!["alpha-note-bbbb", "zeta-login-aaaa"]
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_list_names_includes_symlinked_entries() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        std::fs::write(dir.join("target.data"), b"x")?;
        std::os::unix::fs::symlink(dir.join("target.data"), dir.join("linked-login-cccc.gpg"))?;
        std::os::unix::fs::symlink(dir.join("missing.data"), dir.join("dangling-login-dddd.gpg"))?;

        let store = PassStore::new(RecordingRunner::default(), dir);
        assert_eq!(store.list_names()?, vec!["linked-login-cccc"]);
        assert!(store.exists("linked-login-cccc")?);
        Ok(())
    }

    #[test]
    fn test_list_names_missing_dir_is_empty() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = PassStore::new(RecordingRunner::default(), temp_dir.path().join("absent"));
        assert!(store.list_names()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_exists_and_remove() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = PassStore::new(RecordingRunner::default(), temp_dir.path());
        std::fs::write(store.entry_path("bank-login-1234"), b"cipher")?;

        assert!(store.exists("bank-login-1234")?);
        assert!(!store.exists("other-login-1234")?);

        store.remove("bank-login-1234")?;
        assert!(!store.exists("bank-login-1234")?);

        // Removing again is fine
        store.remove("bank-login-1234")?;
        Ok(())
    }

    #[test]
    fn test_custom_extension() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store =
            PassStore::new(RecordingRunner::default(), temp_dir.path()).with_extension("age");
        std::fs::write(temp_dir.path().join("a.age"), b"x")?;
        std::fs::write(temp_dir.path().join("b.gpg"), b"x")?;

        assert_eq!(store.list_names()?, vec!["a"]);
        assert!(store.entry_path("a").ends_with("a.age"));
        Ok(())
    }

    #[test]
    fn test_insert_invocation() -> anyhow::Result<()> {
        let runner = RecordingRunner::default();
        let store = PassStore::new(&runner, "/tmp/store").with_program("gopass");

        store.insert("wifi-note-def6", "Name: Wifi\n")?;

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.program, "gopass");
        assert_eq!(call.args, vec!["insert", "-m", "wifi-note-def6"]);
        assert_eq!(call.input.as_deref(), Some("Name: Wifi\n"));
        assert_eq!(
            call.envs,
            vec![(STORE_DIR_ENV.to_string(), "/tmp/store".to_string())]
        );
        assert!(!call.log);
        Ok(())
    }
}
