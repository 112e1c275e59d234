//! Configuration management for FlashVault
//!
//! Settings come from an optional `config.toml`, overridden by `FLASHVAULT_*`
//! environment variables, on top of built-in defaults. Everything is read once
//! at startup; changing a value requires a restart.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const GIB: u64 = 1024 * 1024 * 1024;

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_ENV: &str = "FLASHVAULT_CONFIG";

/// How the server decides how many bytes may still be written.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStrategy {
    /// In-memory usage counter checked against `quota_bytes`.
    Counter,
    /// Live filesystem free-space query minus `min_free_bytes`.
    Disk,
}

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the HTTP listener binds to
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    // ═══ STORAGE ═══
    /// Directory exposed by the vault
    pub root_dir: String,

    /// Largest single upload body accepted, in bytes
    pub max_upload_bytes: u64,

    /// Accounting strategy
    pub quota_strategy: QuotaStrategy,

    /// Total bytes the vault may hold (counter strategy)
    pub quota_bytes: u64,

    /// Safety margin subtracted from raw disk-free readings (disk strategy)
    pub min_free_bytes: u64,

    // ═══ INTERNAL BEHAVIOR ═══
    /// Read buffer used while streaming uploads to disk
    pub upload_chunk_bytes: usize,

    /// Entries per browse page
    pub page_size: usize,

    // ═══ WEB UI ═══
    /// Directory served under `/static` for the browse page
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            root_dir: "~/FlashVault".to_string(),
            max_upload_bytes: 40 * GIB,
            quota_strategy: QuotaStrategy::Counter,
            quota_bytes: 100 * GIB,
            min_free_bytes: GIB,
            upload_chunk_bytes: 1024 * 1024,
            page_size: 50,
            static_dir: "static".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `config.toml` (or `$FLASHVAULT_CONFIG`) with
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config".to_string());
        Self::build(Some(&path), true)
    }

    /// Load configuration from one specific file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let path = path.to_string_lossy();
        Self::build(Some(&path), false)
    }

    fn build(path: Option<&str>, with_env: bool) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let mut builder = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("root_dir", defaults.root_dir)?
            .set_default("max_upload_bytes", defaults.max_upload_bytes as i64)?
            .set_default("quota_strategy", "counter")?
            .set_default("quota_bytes", defaults.quota_bytes as i64)?
            .set_default("min_free_bytes", defaults.min_free_bytes as i64)?
            .set_default("upload_chunk_bytes", defaults.upload_chunk_bytes as i64)?
            .set_default("page_size", defaults.page_size as i64)?
            .set_default("static_dir", defaults.static_dir)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        if with_env {
            builder = builder.add_source(Environment::with_prefix("FLASHVAULT").try_parsing(true));
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.root_dir.trim().is_empty() {
            return Err(ConfigError::Message("root_dir cannot be empty".into()));
        }

        if self.quota_strategy == QuotaStrategy::Counter && self.quota_bytes == 0 {
            return Err(ConfigError::Message(
                "quota_bytes must be greater than 0".into(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "max_upload_bytes must be greater than 0".into(),
            ));
        }

        if self.upload_chunk_bytes == 0 {
            return Err(ConfigError::Message(
                "upload_chunk_bytes must be greater than 0".into(),
            ));
        }

        if self.page_size == 0 {
            return Err(ConfigError::Message(
                "page_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Root directory with a leading `~` expanded to `$HOME`
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.root_dir)
    }

    /// Static asset directory with a leading `~` expanded to `$HOME`
    pub fn static_path(&self) -> PathBuf {
        expand_home(&self.static_dir)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}
