//! Tracing setup for binaries and demos.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is left to the application, through [`init_tracing`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{LogFormat, LoggingConfig};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG`, when set, overrides `config.filter`. Returns `false` if a
/// global subscriber was already installed, which is harmless.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    installed.is_ok()
}
