//! Record codecs: turning a [`Session`] into the bytes that get persisted.
//!
//! The store adapter doesn't care how a session is serialized, only that
//! something implements [`RecordCodec`]. [`JsonRecordCodec`] is the
//! default. Every encoded record carries a `version` so a future layout
//! change can be detected instead of misread.

use serde::{Deserialize, Serialize};

use crate::{Session, StoreError};

/// Version written into every record produced by this build.
pub const RECORD_VERSION: u32 = 1;

/// Encodes sessions to bytes and decodes them back.
///
/// `Send + Sync + 'static` because the codec lives inside the store, which
/// is shared with the session manager's spawned renewal tasks.
pub trait RecordCodec: Send + Sync + 'static {
    /// Serializes a session into a versioned record.
    ///
    /// # Errors
    /// Returns [`StoreError::Encode`] if serialization fails.
    fn encode(&self, session: &Session) -> Result<Vec<u8>, StoreError>;

    /// Parses a persisted record.
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] if the bytes are malformed, missing
    /// fields, or were written with a newer record version.
    fn decode(&self, data: &[u8]) -> Result<Session, StoreError>;
}

// ---------------------------------------------------------------------------
// Versioned envelope
// ---------------------------------------------------------------------------

/// On-disk shape: the session fields plus a top-level `version`.
///
/// Records written before versioning existed have no `version` field and
/// decode as version 1.
#[derive(Serialize, Deserialize)]
struct VersionedRecord<T> {
    #[serde(default = "legacy_version")]
    version: u32,
    #[serde(flatten)]
    session: T,
}

fn legacy_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// JsonRecordCodec
// ---------------------------------------------------------------------------

/// A [`RecordCodec`] backed by `serde_json`.
///
/// ```rust
/// use gonet_store::{JsonRecordCodec, RecordCodec, Session, User};
///
/// let codec = JsonRecordCodec;
/// let session = Session {
///     user: User { id: "u-1".into(), name: "Ana".into(), email: "ana@gonet.example".into() },
///     access_token: "a".into(),
///     refresh_token: "r".into(),
///     expires_at: 1_700_000_000_000,
/// };
///
/// let bytes = codec.encode(&session).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), session);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordCodec;

#[cfg(feature = "json")]
impl RecordCodec for JsonRecordCodec {
    fn encode(&self, session: &Session) -> Result<Vec<u8>, StoreError> {
        let record = VersionedRecord {
            version: RECORD_VERSION,
            session,
        };
        serde_json::to_vec(&record).map_err(StoreError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<Session, StoreError> {
        let record: VersionedRecord<Session> = serde_json::from_slice(data)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if record.version > RECORD_VERSION {
            return Err(StoreError::Corrupt(format!(
                "record version {} is newer than supported version {RECORD_VERSION}",
                record.version
            )));
        }
        Ok(record.session)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::User;

    fn sample() -> Session {
        Session {
            user: User {
                id: "u-7".into(),
                name: "Luis".into(),
                email: "luis@gonet.example".into(),
            },
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_encode_writes_current_version() {
        let bytes = JsonRecordCodec.encode(&sample()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["version"], RECORD_VERSION);
        assert_eq!(json["user"]["id"], "u-7");
        assert_eq!(json["expiresAt"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_decode_round_trips_session() {
        let codec = JsonRecordCodec;
        let original = sample();

        let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_legacy_record_without_version() {
        let legacy = br#"{
            "user": {"id": "u-7", "name": "Luis", "email": "luis@gonet.example"},
            "accessToken": "access",
            "refreshToken": "refresh",
            "expiresAt": 1700000000000
        }"#;

        let decoded = JsonRecordCodec.decode(legacy).unwrap();

        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_newer_version_is_corrupt() {
        let future = br#"{
            "version": 99,
            "user": {"id": "u-7", "name": "Luis", "email": "luis@gonet.example"},
            "accessToken": "access",
            "refreshToken": "refresh",
            "expiresAt": 1700000000000
        }"#;

        let result = JsonRecordCodec.decode(future);

        assert!(matches!(result, Err(StoreError::Corrupt(msg)) if msg.contains("99")));
    }

    #[test]
    fn test_decode_garbage_is_corrupt() {
        let result = JsonRecordCodec.decode(b"not json {{{");

        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_decode_missing_field_is_corrupt() {
        let partial = br#"{"version": 1, "accessToken": "a", "refreshToken": "r", "expiresAt": 1}"#;

        let result = JsonRecordCodec.decode(partial);

        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_decode_wrong_type_is_corrupt() {
        let wrong = br#"{
            "user": {"id": "u-7", "name": "Luis", "email": "luis@gonet.example"},
            "accessToken": "access",
            "refreshToken": "refresh",
            "expiresAt": "tomorrow"
        }"#;

        assert!(JsonRecordCodec.decode(wrong).unwrap_err().is_corrupt());
    }
}
