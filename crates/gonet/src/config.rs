//! File-based configuration for the whole session core.
//!
//! Every section is optional; a missing section or field takes its default.
//!
//! ```toml
//! [session.renewal]
//! timeout_ms = 10000
//! max_retries = 1
//!
//! [lifecycle]
//! expiry_check_interval_ms = 30000
//!
//! [store]
//! kind = "file"
//! dir = "/var/lib/gonet"
//!
//! [http]
//! base_url = "https://api.gonet.example/v1/"
//!
//! [logging]
//! filter = "info,gonet_session=debug"
//! format = "pretty"
//! ```

use std::path::{Path, PathBuf};

use gonet_http::HttpBackendConfig;
use gonet_lifecycle::LifecycleConfig;
use gonet_session::SessionConfig;
use gonet_store::{FileStore, JsonRecordCodec, KeyedSessionStore, MemoryStore};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, StoreBackend};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GonetConfig {
    pub session: SessionConfig,
    pub lifecycle: LifecycleConfig,
    pub store: StoreConfig,
    /// Auth API location. `None` when the host supplies its own backend.
    pub http: Option<HttpBackendConfig>,
    pub logging: LoggingConfig,
}

impl GonetConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Opens the configured session store.
    pub fn session_store(&self) -> KeyedSessionStore<StoreBackend, JsonRecordCodec> {
        KeyedSessionStore::json(self.store.open())
    }
}

/// Which backend holds the persisted session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Forgotten when the process exits.
    #[default]
    Memory,
    /// One file per key under `dir`.
    File { dir: PathBuf },
}

impl StoreConfig {
    pub fn open(&self) -> StoreBackend {
        match self {
            Self::Memory => StoreBackend::Memory(MemoryStore::new()),
            Self::File { dir } => StoreBackend::File(FileStore::new(dir.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}
