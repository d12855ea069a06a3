//! Session persistence for GoNet.
//!
//! This crate owns everything about how a signed-in session survives an
//! app restart:
//!
//! - **Record** ([`Session`], [`User`]): the credential bundle that gets
//!   persisted.
//! - **Codec** ([`RecordCodec`] trait, [`JsonRecordCodec`]): how a
//!   session is turned into bytes and back, including the record version.
//! - **Backends** ([`KeyValueStore`] trait, [`MemoryStore`], [`FileStore`]):
//!   the opaque durable key-value store the bytes land in.
//! - **Adapter** ([`SessionStore`] trait, [`KeyedSessionStore`]): the typed
//!   interface the session manager talks to.
//!
//! # Architecture
//!
//! ```text
//! SessionManager ──→ SessionStore (typed) ──→ RecordCodec ──→ KeyValueStore (bytes)
//! ```
//!
//! The backend is picked by the hosting application when it constructs the
//! store. Nothing in here branches on the platform at runtime.

#![allow(async_fn_in_trait)]

mod backend;
mod codec;
mod error;
mod record;
mod store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use codec::{RECORD_VERSION, RecordCodec};
#[cfg(feature = "json")]
pub use codec::JsonRecordCodec;
pub use error::StoreError;
pub use record::{Session, User};
pub use store::{KeyedSessionStore, SESSION_KEY, SessionStore};
