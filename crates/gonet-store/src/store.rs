//! The typed session store the session manager talks to.

use std::future::Future;

use tracing::debug;

use crate::{KeyValueStore, RecordCodec, Session, StoreError};

/// Key the session record is persisted under.
pub const SESSION_KEY: &str = "session";

/// Persistence interface for the single signed-in session.
///
/// There is at most one session at a time. `save` replaces it entirely,
/// `clear` removes it.
pub trait SessionStore: Send + Sync + 'static {
    /// Reads the persisted session.
    ///
    /// # Returns
    /// - `Ok(Some(session))`: a well-formed record was found
    /// - `Ok(None)`: nothing is persisted
    /// - `Err(StoreError::Corrupt)`: bytes exist but can't be decoded
    /// - `Err(_)` otherwise: the backend couldn't be read
    fn load(&self) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Persists `session`, fully overwriting the previous one.
    ///
    /// # Errors
    /// [`StoreError::Incomplete`] if any required field is empty, or the
    /// backend's error if the write fails.
    fn save(&self, session: &Session) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the persisted session. Succeeds if there was none.
    fn clear(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// [`SessionStore`] that encodes the session with a [`RecordCodec`] and
/// keeps it in a [`KeyValueStore`] under [`SESSION_KEY`].
#[derive(Debug, Clone)]
pub struct KeyedSessionStore<K, C> {
    backend: K,
    codec: C,
}

impl<K: KeyValueStore, C: RecordCodec> KeyedSessionStore<K, C> {
    pub fn new(backend: K, codec: C) -> Self {
        Self { backend, codec }
    }

    /// The underlying key-value backend.
    pub fn backend(&self) -> &K {
        &self.backend
    }
}

#[cfg(feature = "json")]
impl<K: KeyValueStore> KeyedSessionStore<K, crate::JsonRecordCodec> {
    /// Shorthand for a JSON-encoded store over `backend`.
    pub fn json(backend: K) -> Self {
        Self::new(backend, crate::JsonRecordCodec)
    }
}

impl<K: KeyValueStore, C: RecordCodec> SessionStore for KeyedSessionStore<K, C> {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(bytes) = self.backend.get(SESSION_KEY).await? else {
            debug!(key = SESSION_KEY, "no persisted session");
            return Ok(None);
        };
        let session = self.codec.decode(&bytes)?;
        if let Some(field) = session.missing_field() {
            return Err(StoreError::Corrupt(format!("persisted session has empty {field}")));
        }
        debug!(key = SESSION_KEY, user_id = %session.user.id, bytes = bytes.len(), "loaded persisted session");
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        if let Some(field) = session.missing_field() {
            return Err(StoreError::Incomplete(field));
        }
        let bytes = self.codec.encode(session)?;
        debug!(key = SESSION_KEY, user_id = %session.user.id, bytes = bytes.len(), "saving session");
        self.backend.put(SESSION_KEY, bytes).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        debug!(key = SESSION_KEY, "clearing persisted session");
        self.backend.remove(SESSION_KEY).await
    }
}
