//! Session lifecycle for the GoNet customer app.
//!
//! This crate owns the signed-in session from process start to logout:
//!
//! 1. **Loading**: reading the persisted session once at startup
//!    ([`SessionManager::initialize`])
//! 2. **Expiry**: noticing when the access token has run out
//! 3. **Renewal**: silently exchanging the refresh token for a new session
//!    through a [`RenewalBackend`], with bounded retries
//! 4. **Teardown**: logout, or giving up after a terminal renewal failure
//!
//! # How it fits in the stack
//!
//! ```text
//! UI / Router (above)  ← observes SessionPhase, listens for SignedOut
//!     ↕
//! Session Layer (this crate)  ← single owner of the session state
//!     ↕
//! Store (below)  ← gonet-store: persisted record, secure storage backend
//! ```

#![allow(async_fn_in_trait)]

mod backend;
mod clock;
mod config;
mod error;
mod manager;
mod state;

pub use backend::RenewalBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RenewalPolicy, SessionConfig};
pub use error::{RenewalError, SessionError};
pub use gonet_store::{Session, User};
pub use manager::SessionManager;
pub use state::{
    RenewalOrigin, RenewalOutcome, SessionEvent, SessionLoadState, SessionPhase,
    SignOutReason,
};
