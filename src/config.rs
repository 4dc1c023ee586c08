//! Config module - bw2pass settings (bw2pass.toml).
//!
//! The file is optional. It holds:
//! - Which binaries to run for the source and destination stores
//! - Unlock retry bounds
//! - Where the password store lives and its entry extension
//! - Run defaults (strict validation, command logging)

use crate::destination::pass;
use crate::source::{bitwarden, UnlockPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source store (Bitwarden CLI) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_program")]
    pub program: String,
    /// Maximum number of `bw unlock` attempts
    #[serde(default = "default_unlock_attempts")]
    pub unlock_attempts: u32,
    /// Give up unlocking after this many seconds
    #[serde(default = "default_unlock_timeout_secs")]
    pub unlock_timeout_secs: u64,
    #[serde(default = "default_unlock_retry_delay_ms")]
    pub unlock_retry_delay_ms: u64,
}

fn default_source_program() -> String {
    bitwarden::DEFAULT_PROGRAM.to_string()
}

fn default_unlock_attempts() -> u32 {
    5
}

fn default_unlock_timeout_secs() -> u64 {
    300
}

fn default_unlock_retry_delay_ms() -> u64 {
    1000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            program: default_source_program(),
            unlock_attempts: default_unlock_attempts(),
            unlock_timeout_secs: default_unlock_timeout_secs(),
            unlock_retry_delay_ms: default_unlock_retry_delay_ms(),
        }
    }
}

/// Destination store (pass) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(default = "default_destination_program")]
    pub program: String,
    /// Store directory, used when `PASSWORD_STORE_DIR` is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_destination_program() -> String {
    pass::DEFAULT_PROGRAM.to_string()
}

fn default_extension() -> String {
    pass::DEFAULT_EXTENSION.to_string()
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            program: default_destination_program(),
            store_dir: None,
            extension: default_extension(),
        }
    }
}

/// Run defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Abort before writing anything if any item is invalid
    #[serde(default)]
    pub strict: bool,
    /// Echo external commands before running them
    #[serde(default = "default_true")]
    pub log_commands: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strict: false,
            log_commands: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub destination: DestinationConfig,

    #[serde(default)]
    pub run: RunConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            source: SourceConfig::default(),
            destination: DestinationConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// Default config directory (~/.config/bw2pass/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("bw2pass"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("bw2pass.toml")
}

/// `~/.password-store`
pub fn default_store_dir() -> PathBuf {
    dirs::home_dir()
        .map(|d| d.join(".password-store"))
        .unwrap_or_else(|| PathBuf::from(".password-store"))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn unlock_policy(&self) -> UnlockPolicy {
        UnlockPolicy {
            max_attempts: self.source.unlock_attempts.max(1),
            timeout: Duration::from_secs(self.source.unlock_timeout_secs),
            retry_delay: Duration::from_millis(self.source.unlock_retry_delay_ms),
        }
    }

    /// Store directory: explicit override, then `PASSWORD_STORE_DIR`,
    /// then the config file, then `~/.password-store`.
    pub fn resolve_store_dir(
        &self,
        override_dir: Option<PathBuf>,
        env_dir: Option<String>,
    ) -> PathBuf {
        override_dir
            .or_else(|| env_dir.filter(|d| !d.is_empty()).map(PathBuf::from))
            .or_else(|| self.destination.store_dir.clone())
            .unwrap_or_else(default_store_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.source.program, "bw");
        assert_eq!(config.destination.program, "pass");
        assert_eq!(config.destination.extension, "gpg");
        assert!(!config.run.strict);
        assert!(config.run.log_commands);
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("bw2pass.toml");

        let mut config = Config::new();
        config.destination.store_dir = Some(PathBuf::from("/srv/pass"));
        config.run.strict = true;
        config.save(&config_path)?;

        let loaded = Config::load(&config_path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [source]
            unlock_attempts = 2

            [destination]
            extension = "age"
            "#,
        )?;
        assert_eq!(config.version, 1);
        assert_eq!(config.source.unlock_attempts, 2);
        assert_eq!(config.source.unlock_timeout_secs, 300);
        assert_eq!(config.source.program, "bw");
        assert_eq!(config.destination.extension, "age");
        assert_eq!(config.destination.store_dir, None);
        assert!(config.run.log_commands);
        Ok(())
    }

    #[test]
    fn test_load_or_default_missing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_or_default(&temp_dir.path().join("absent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_unlock_policy() {
        let mut config = Config::default();
        config.source.unlock_attempts = 0;
        config.source.unlock_retry_delay_ms = 250;

        let policy = config.unlock_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.timeout, Duration::from_secs(300));
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_store_dir_precedence() {
        let mut config = Config::default();
        config.destination.store_dir = Some(PathBuf::from("/from/config"));

        assert_eq!(
            config.resolve_store_dir(Some(PathBuf::from("/from/flag")), Some("/from/env".into())),
            PathBuf::from("/from/flag")
        );
        assert_eq!(
            config.resolve_store_dir(None, Some("/from/env".into())),
            PathBuf::from("/from/env")
        );
        assert_eq!(
            config.resolve_store_dir(None, Some(String::new())),
            PathBuf::from("/from/config")
        );

        config.destination.store_dir = None;
        assert_eq!(config.resolve_store_dir(None, None), default_store_dir());
        assert!(default_store_dir().ends_with(".password-store"));
    }
}
