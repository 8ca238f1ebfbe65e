//! Toolkit configuration.
//!
//! Loaded from an optional TOML file named by `PRIVKIT_CONFIG`, then
//! overridden by environment variables. There is no built-in encryption
//! key: a deployment without one fails to start.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use privkit_core::EncryptionKey;
use privkit_store::ReadPolicy;

use crate::error::ConfigError;
use crate::logger::LoggerConfig;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "PRIVKIT_CONFIG";

/// Key variables, in priority order.
const KEY_VARS: [&str; 3] = ["PRIVKIT_ENCRYPTION_KEY", "ENCRYPTION_KEY", "PRIVACY_KEY"];

/// Where documents are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process only; nothing survives a restart.
    Memory,
    /// One encrypted file per document under `data_dir`.
    #[default]
    File,
    /// `privkit.db` under `data_dir`.
    Sqlite,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError::InvalidValue {
                name: "PRIVKIT_BACKEND".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// `[logger]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub buffer_limit: usize,
    pub flush_interval_ms: u64,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        let defaults = LoggerConfig::default();
        Self {
            buffer_limit: defaults.buffer_limit,
            flush_interval_ms: defaults.flush_interval.as_millis() as u64,
        }
    }
}

impl From<LoggerSettings> for LoggerConfig {
    fn from(settings: LoggerSettings) -> Self {
        Self {
            buffer_limit: settings.buffer_limit.max(1),
            flush_interval: Duration::from_millis(settings.flush_interval_ms),
        }
    }
}

/// Configuration for [`Toolkit::open`](crate::Toolkit::open).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Secret the document key is derived from.
    pub encryption_key: Option<String>,
    pub data_dir: PathBuf,
    pub backend: BackendKind,
    pub read_policy: ReadPolicy,
    pub logger: LoggerSettings,
    pub app_name: String,
    pub log_level: String,
    pub port: u16,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            data_dir: PathBuf::from("data"),
            backend: BackendKind::default(),
            read_policy: ReadPolicy::default(),
            logger: LoggerSettings::default(),
            app_name: "privkit".into(),
            log_level: "info".into(),
            port: 3000,
        }
    }
}

impl fmt::Debug for ToolkitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitConfig")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .field("data_dir", &self.data_dir)
            .field("backend", &self.backend)
            .field("read_policy", &self.read_policy)
            .field("logger", &self.logger)
            .field("app_name", &self.app_name)
            .field("log_level", &self.log_level)
            .field("port", &self.port)
            .finish()
    }
}

impl ToolkitConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = match get(CONFIG_PATH_VAR) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(key) = KEY_VARS.iter().find_map(|&name| get(name)) {
            config.encryption_key = Some(key);
        }
        if let Some(dir) = get("PRIVKIT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = get("PRIVKIT_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(policy) = get("PRIVKIT_READ_POLICY") {
            config.read_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "lenient" => ReadPolicy::Lenient,
                "strict" => ReadPolicy::Strict,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "PRIVKIT_READ_POLICY".into(),
                        value: policy,
                    })
                }
            };
        }
        if let Some(name) = get("APP_NAME") {
            config.app_name = name;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(port) = get("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT".into(),
                value: port.clone(),
            })?;
        }

        Ok(config)
    }

    /// Load a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Derive the document key.
    pub fn key(&self) -> Result<EncryptionKey, ConfigError> {
        match self.encryption_key.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(EncryptionKey::from_secret(secret)),
            _ => Err(ConfigError::MissingEncryptionKey),
        }
    }

    pub fn logger_config(&self) -> LoggerConfig {
        self.logger.into()
    }
}
