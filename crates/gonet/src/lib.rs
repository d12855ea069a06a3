//! # GoNet session core
//!
//! Keeps the customer signed in across app restarts and token expiry.
//!
//! The work is split across crates; this one re-exports them and wires them
//! together:
//!
//! - `gonet-store`: the persisted session record and storage backends
//! - `gonet-session`: the [`SessionManager`] state machine
//! - `gonet-lifecycle`: foreground/background handling and periodic checks
//! - `gonet-http`: the HTTP auth backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gonet::prelude::*;
//!
//! # async fn run() -> Result<(), GonetError> {
//! let config = GonetConfig::load("gonet.toml")?;
//! gonet::telemetry::init_tracing(&config.logging);
//!
//! let Some(http) = &config.http else { return Ok(()) };
//! let runtime = SessionRuntime::builder()
//!     .config(&config)
//!     .build(config.session_store(), HttpRenewalBackend::new(http)?);
//!
//! if runtime.initialize().await.is_authenticated() {
//!     // show the home screen
//! }
//!
//! // Forward platform callbacks:
//! runtime.signal().entered_background();
//! runtime.signal().entered_foreground();
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod runtime;
mod store;
pub mod telemetry;

pub use config::{GonetConfig, LogFormat, LoggingConfig, StoreConfig};
pub use error::{ConfigError, GonetError};
pub use runtime::{SessionRuntime, SessionRuntimeBuilder};
pub use store::StoreBackend;

pub use gonet_http::{HttpBackendConfig, HttpError, HttpRenewalBackend};
pub use gonet_lifecycle::{
    ForegroundHandler, LifecycleConfig, LifecycleEvent, LifecycleMonitor, LifecycleSignal,
    SignalError, Visibility,
};
pub use gonet_session::{
    Clock, ManualClock, RenewalBackend, RenewalError, RenewalOrigin, RenewalOutcome,
    RenewalPolicy, SessionConfig, SessionError, SessionEvent, SessionLoadState, SessionManager,
    SessionPhase, SignOutReason, SystemClock,
};
pub use gonet_store::{
    FileStore, JsonRecordCodec, KeyValueStore, KeyedSessionStore, MemoryStore, RecordCodec,
    SESSION_KEY, Session, SessionStore, StoreError, User,
};

pub mod prelude {
    pub use crate::{
        GonetConfig, GonetError, HttpRenewalBackend, LifecycleSignal, RenewalBackend,
        RenewalError, Session, SessionEvent, SessionLoadState, SessionManager, SessionPhase,
        SessionRuntime, SessionStore, SignOutReason, User,
    };
}
