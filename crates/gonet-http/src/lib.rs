//! HTTP auth backend for GoNet.
//!
//! Implements [`RenewalBackend`](gonet_session::RenewalBackend) against the
//! GoNet auth API with `reqwest`:
//!
//! - `POST {base_url}/auth/refresh` trades a refresh token for a new session
//! - `POST {base_url}/auth/logout` revokes a session on logout
//!
//! HTTP status codes are mapped onto [`RenewalError`](gonet_session::RenewalError)
//! so the session manager can tell a rejected token from a flaky network.

#![allow(async_fn_in_trait)]

mod client;
mod config;
mod error;

pub use client::HttpRenewalBackend;
pub use config::HttpBackendConfig;
pub use error::HttpError;
