//! Session states and the values the manager hands to consumers.
//!
//! ```text
//! Uninitialized ─→ Loading ─┬─(valid)──────────────────→ Authenticated
//!                           │                              │       ▲
//!                           ├─(expired)─→ Renewing ◀─(expired)     │
//!                           │                │  └───────(ok)───────┘
//!                           │              (fail)
//!                           ▼                ▼
//!                      Unauthenticated ◀─────┘        logout: any → Unauthenticated
//! ```

use gonet_store::Session;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a renewal was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOrigin {
    /// The persisted session was already expired when loaded. Nothing has
    /// been shown to consumers yet.
    Startup,

    /// A session that consumers were already using ran out.
    Foreground,
}

/// The session state machine's current state.
///
/// Published through [`SessionManager::subscribe`](crate::SessionManager::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// `initialize()` has not run yet.
    Uninitialized,

    /// Reading the persisted session.
    Loading,

    /// A valid session is held.
    Authenticated(Session),

    /// The held session expired and is being renewed. `previous` is the
    /// expired session, still shown to consumers for foreground renewals so
    /// protected screens aren't torn down mid-attempt.
    Renewing {
        previous: Session,
        origin: RenewalOrigin,
    },

    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionPhase {
    /// The session consumers may use in this phase.
    ///
    /// `None` for every phase except `Authenticated` and a foreground
    /// `Renewing`, which keeps the stale session visible.
    pub fn visible_session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Renewing {
                previous,
                origin: RenewalOrigin::Foreground,
            } => Some(previous),
            _ => None,
        }
    }

    /// The session held in memory regardless of visibility.
    pub(crate) fn held_session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) | Self::Renewing { previous: session, .. } => {
                Some(session)
            }
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Authenticated(_) => "authenticated",
            Self::Renewing { .. } => "renewing",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionLoadState
// ---------------------------------------------------------------------------

/// Process-wide gating status for the UI.
///
/// Nothing may render a protected view before this is `Ready(Some(_))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLoadState {
    Uninitialized,

    /// Loading, including a renewal of an expired persisted session.
    Loading,

    /// Settled. `Some` while signed in (including during a foreground
    /// renewal), `None` when signed out.
    Ready(Option<Session>),

    /// Signed out because the store couldn't be read at startup. Gates
    /// exactly like `Ready(None)`; carries the error for a banner.
    Error(SessionError),
}

impl SessionLoadState {
    /// Returns `true` if a protected view may render.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Ready(Some(_)))
    }

    /// Returns `true` once loading has finished, whatever the outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Error(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Ready(session) => session.as_ref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes and events
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user logged out.
    Logout,
    /// The backend rejected the refresh token.
    RefreshRejected,
    /// The renewal response carried an unusable expiry.
    InvalidExpiry,
    /// Transient renewal failures outlasted the retry policy.
    RenewalExhausted,
    /// A renewed startup session could not be persisted.
    StoreWriteFailed,
}

impl SignOutReason {
    /// Returns `true` if the user was signed out involuntarily and should
    /// be sent to the login flow.
    pub fn requires_login(&self) -> bool {
        !matches!(self, Self::Logout)
    }

    pub(crate) fn for_error(err: &SessionError) -> Self {
        match err {
            SessionError::RenewalRejected(_) => Self::RefreshRejected,
            SessionError::InvalidExpiry { .. } => Self::InvalidExpiry,
            SessionError::StoreWrite(_) => Self::StoreWriteFailed,
            _ => Self::RenewalExhausted,
        }
    }
}

/// Result of [`SessionManager::renew_if_expired`](crate::SessionManager::renew_if_expired).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Not signed in, or the held session hasn't expired.
    NotNeeded,

    /// A fresh session was persisted and adopted.
    Renewed,

    /// The attempt failed but the previous session is kept (its
    /// replacement could not be persisted).
    Retained,

    /// Renewal failed terminally; the session is gone.
    SignedOut(SignOutReason),

    /// A logout or sign-in happened while the renewal was in flight, and
    /// its result was discarded.
    Superseded,

    /// The renewal task died before reporting.
    Aborted,
}

/// Discrete notifications for listeners such as the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    RenewalStarted { origin: RenewalOrigin },
    Renewed { user_id: String, expires_at: i64 },
    /// Renewal failed but the session was kept. Show a non-blocking notice.
    RenewalFailed { error: SessionError },
    SignedOut { reason: SignOutReason },
}
