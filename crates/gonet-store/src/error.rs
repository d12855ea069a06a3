//! Error types for the persistence layer.

/// Errors that can occur while reading or writing the persisted session.
///
/// The split between [`StoreError::Corrupt`] and the backend variants
/// matters to callers: a corrupt record is a data problem (the bytes are
/// there but unusable) while `Io`/`Backend` mean the store itself could not
/// be reached.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying file system or device failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A non-I/O backend failure (keychain locked, store closed, ...).
    #[error("store backend failed: {0}")]
    Backend(String),

    /// The persisted bytes could not be decoded into a session record.
    ///
    /// Covers malformed JSON, missing fields, wrong types and records
    /// written by a newer app version than this one understands.
    #[error("persisted session is corrupt: {0}")]
    Corrupt(String),

    /// Serializing a session failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Refused to persist a session with an empty field.
    #[error("refusing to persist incomplete session: missing {0}")]
    Incomplete(&'static str),
}

impl StoreError {
    /// Returns `true` if the error is about the stored data rather than the
    /// store being unreachable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}
