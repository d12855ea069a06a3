//! Unified error type for the GoNet session core.

use std::path::PathBuf;

use gonet_http::HttpError;
use gonet_session::SessionError;
use gonet_store::StoreError;

/// Failure loading a [`GonetConfig`](crate::GonetConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum GonetError {
    /// Reading or writing the persisted session.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session operation (sign-in, renewal) failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The HTTP backend could not be set up.
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
