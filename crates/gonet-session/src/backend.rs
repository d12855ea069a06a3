//! The auth backend the session manager renews sessions against.
//!
//! GoNet's session core doesn't speak HTTP itself. It defines
//! [`RenewalBackend`]: an async method that trades a refresh token for a
//! fresh [`Session`], plus a best-effort revoke used on logout. The
//! production implementation lives in `gonet-http`; tests plug in scripted
//! backends.

use std::future::Future;

use gonet_store::Session;

use crate::RenewalError;

/// Exchanges refresh tokens for new sessions.
///
/// # Example
///
/// ```rust
/// use gonet_session::{RenewalBackend, RenewalError, Session, User};
///
/// /// Hands out a one-hour session for any token. Demo use only.
/// struct AlwaysRenew;
///
/// impl RenewalBackend for AlwaysRenew {
///     async fn renew(&self, refresh_token: &str) -> Result<Session, RenewalError> {
///         if refresh_token.is_empty() {
///             return Err(RenewalError::Rejected("empty token".into()));
///         }
///         Ok(Session {
///             user: User { id: "u-1".into(), name: "Demo".into(), email: "demo@gonet.example".into() },
///             access_token: "fresh".into(),
///             refresh_token: refresh_token.to_owned(),
///             expires_at: i64::MAX,
///         })
///     }
///
///     async fn revoke(&self, _session: &Session) -> Result<(), RenewalError> {
///         Ok(())
///     }
/// }
/// ```
pub trait RenewalBackend: Send + Sync + 'static {
    /// Trades `refresh_token` for a complete new session.
    ///
    /// # Returns
    /// - `Ok(Session)`: the replacement session (its expiry is validated by
    ///   the caller)
    /// - `Err(RenewalError::Rejected)`: the token is no good, don't retry
    /// - `Err(RenewalError::Network | Server)`: transient, may be retried
    fn renew(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Session, RenewalError>> + Send;

    /// Invalidates `session` on the server side.
    ///
    /// Called on logout after local state is already gone. Failures are
    /// logged and otherwise ignored.
    fn revoke(&self, session: &Session) -> impl Future<Output = Result<(), RenewalError>> + Send;
}
