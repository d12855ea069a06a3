//! Error types for the session layer.

/// Why the auth backend could not renew a session.
///
/// Each variant has a stable machine-readable [`reason`](Self::reason) that
/// matches what the backend reports on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewalError {
    /// The backend explicitly refused the refresh token. Retrying can't help.
    #[error("refresh token rejected: {0}")]
    Rejected(String),

    /// The request never got a usable answer (connection, DNS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a server-side failure.
    #[error("server error: {0}")]
    Server(String),
}

impl RenewalError {
    /// Machine-readable reason: `expired_refresh_token`, `network` or
    /// `server_error`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "expired_refresh_token",
            Self::Network(_) => "network",
            Self::Server(_) => "server_error",
        }
    }

    /// Transient failures are retried; rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server(_))
    }

    /// Parses a wire reason back into an error carrying `detail`.
    ///
    /// Returns `None` for a reason this client doesn't know.
    pub fn from_reason(reason: &str, detail: impl Into<String>) -> Option<Self> {
        let detail = detail.into();
        match reason {
            "expired_refresh_token" => Some(Self::Rejected(detail)),
            "network" => Some(Self::Network(detail)),
            "server_error" => Some(Self::Server(detail)),
            _ => None,
        }
    }
}

/// Errors surfaced by the session manager.
///
/// Most of these never reach a caller as an `Err`: they end up as state
/// (`SessionLoadState::Error`, [`SessionManager::last_error`]) for a banner
/// or toast. Only `sign_in` returns them directly.
///
/// [`SessionManager::last_error`]: crate::SessionManager::last_error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The persisted session could not be read.
    #[error("could not read persisted session: {0}")]
    StoreRead(String),

    /// A new session could not be persisted, so it was not adopted.
    #[error("could not persist session: {0}")]
    StoreWrite(String),

    /// Renewal kept failing for transient reasons until retries ran out.
    #[error("session renewal failed after {attempts} attempts: {detail}")]
    RenewalNetwork { attempts: u32, detail: String },

    /// The backend rejected the refresh token.
    #[error("session renewal rejected: {0}")]
    RenewalRejected(String),

    /// A session whose expiry is not in the future was offered for use.
    #[error("session expiry {expires_at} is not after current time {now}")]
    InvalidExpiry { expires_at: i64, now: i64 },

    /// The session was signed out or replaced while this operation ran.
    #[error("session was replaced while the operation was in flight")]
    Superseded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings_match_wire_values() {
        assert_eq!(RenewalError::Rejected("x".into()).reason(), "expired_refresh_token");
        assert_eq!(RenewalError::Network("x".into()).reason(), "network");
        assert_eq!(RenewalError::Server("x".into()).reason(), "server_error");
    }

    #[test]
    fn test_from_reason_round_trips_known_reasons() {
        for err in [
            RenewalError::Rejected("d".into()),
            RenewalError::Network("d".into()),
            RenewalError::Server("d".into()),
        ] {
            assert_eq!(RenewalError::from_reason(err.reason(), "d"), Some(err));
        }
    }

    #[test]
    fn test_from_reason_unknown_is_none() {
        assert_eq!(RenewalError::from_reason("teapot", "418"), None);
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(!RenewalError::Rejected("x".into()).is_retryable());
        assert!(RenewalError::Network("x".into()).is_retryable());
        assert!(RenewalError::Server("x".into()).is_retryable());
    }

    #[test]
    fn test_invalid_expiry_display_includes_both_instants() {
        let err = SessionError::InvalidExpiry {
            expires_at: 5,
            now: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains('5') && msg.contains('9'));
    }
}
