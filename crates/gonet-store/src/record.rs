//! The persisted session record.
//!
//! A [`Session`] is the signed-in user's credential bundle: who they are,
//! the tokens used to talk to the backend, and when the access token stops
//! being valid. It is either fully populated or absent; there is no such
//! thing as a half-signed-in user.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Identity of the signed-in customer.
///
/// Owned by its [`Session`] and replaced wholesale whenever the session is
/// renewed, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque account id assigned by the auth backend.
    pub id: String,
    /// Display name.
    pub name: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated session.
///
/// Field names serialize as camelCase (`accessToken`, `expiresAt`, ...) so
/// the persisted record and the auth backend's response share one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,

    /// Bearer token for authenticated API calls.
    pub access_token: String,

    /// Only ever sent to the auth backend to obtain a new access token.
    pub refresh_token: String,

    /// Absolute expiry of the access token, in epoch milliseconds.
    pub expires_at: i64,
}

impl Session {
    /// Returns `true` if the session is expired at `now_ms`.
    ///
    /// The boundary is inclusive: a session whose `expires_at` equals the
    /// current instant is already expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime at `now_ms`, or zero once expired.
    pub fn expires_in(&self, now_ms: i64) -> Duration {
        let remaining = self.expires_at.saturating_sub(now_ms);
        Duration::from_millis(u64::try_from(remaining).unwrap_or(0))
    }

    /// Name of the first empty field, if any.
    ///
    /// Used by the store to refuse partial sessions.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.user.id.is_empty() {
            Some("user.id")
        } else if self.access_token.is_empty() {
            Some("accessToken")
        } else if self.refresh_token.is_empty() {
            Some("refreshToken")
        } else {
            None
        }
    }

    /// Returns `true` if every required field is populated.
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }
}
