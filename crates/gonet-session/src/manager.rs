//! The session manager: single owner of the signed-in session.
//!
//! Responsibilities:
//! - Loading the persisted session once at startup
//! - Deciding when the held session has expired
//! - Renewing it silently, with bounded retries and per-attempt timeouts
//! - Persisting every new session before exposing it
//! - Tearing the session down on logout or terminal renewal failure
//!
//! # Concurrency note
//!
//! `SessionManager` is a cheap `Clone` handle; every clone drives the same
//! state. In-memory state sits behind a plain `std::sync::Mutex` whose
//! critical sections are short and never span an `.await`. Concurrent
//! callers are coalesced instead of serialized:
//!
//! - `initialize()` spawns its load once and keeps it as a `Shared` future,
//!   so N concurrent callers cause one store read and a cancelled caller
//!   can't leave the load half done.
//! - A renewal runs in its own spawned task, wrapped in a `Shared` future.
//!   Later callers join that future instead of starting another one, and a
//!   caller dropping its future can't strand the machine in `Renewing`.
//!
//! Ordering between a renewal and a logout is decided by a generation
//! counter. `logout()` and `sign_in()` bump it, and a renewal that finishes
//! under an older generation is dropped. Every store write goes through
//! one async gate, so a late renewal save can't land after a logout's clear.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use gonet_store::{Session, SessionStore};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::{
    Clock, RenewalBackend, RenewalOrigin, RenewalOutcome, SessionConfig, SessionError,
    SessionEvent, SessionLoadState, SessionPhase, SignOutReason, SystemClock,
};

type RenewalFuture = Shared<BoxFuture<'static, RenewalOutcome>>;
type LoadFuture = Shared<BoxFuture<'static, ()>>;

/// In-memory state, guarded by `Core::inner`.
struct Inner {
    phase: SessionPhase,

    /// Bumped by logout and sign-in. Work started under an older value is
    /// stale and must not touch state or the store.
    generation: u64,

    /// The renewal currently in flight, if any. Set together with
    /// `SessionPhase::Renewing` and cleared together with it.
    renewal: Option<RenewalFuture>,

    last_error: Option<SessionError>,

    /// Why the startup load failed, if the store was unreadable.
    load_error: Option<SessionError>,
}

struct Core<S, B> {
    store: S,
    backend: B,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    phase_tx: watch::Sender<SessionPhase>,
    events_tx: broadcast::Sender<SessionEvent>,
    /// The startup load, spawned by the first `initialize()`.
    init: OnceLock<LoadFuture>,
    /// Serializes every write to the store.
    store_gate: tokio::sync::Mutex<()>,
}

impl<S, B> Core<S, B> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Moves to `next` and publishes it to subscribers.
    fn transition(&self, inner: &mut Inner, next: SessionPhase) {
        debug!(from = inner.phase.name(), to = next.name(), "session phase changed");
        inner.phase = next;
        self.phase_tx.send_replace(inner.phase.clone());
    }

    fn emit(&self, event: SessionEvent) {
        // No listeners is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Owns the session lifecycle.
///
/// ## Lifecycle
///
/// ```text
/// initialize() ──→ load ──┬──→ [Authenticated] ──(expired)──→ renew ──→ [Authenticated]
///                         │                                     │
///                         ├──→ renew (startup)                  └──(fail)──→ [Unauthenticated]
///                         │
///                         └──→ [Unauthenticated]
///
/// logout() ──→ [Unauthenticated] from anywhere
/// ```
pub struct SessionManager<S, B> {
    core: Arc<Core<S, B>>,
}

impl<S, B> Clone for SessionManager<S, B> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S: SessionStore, B: RenewalBackend> SessionManager<S, B> {
    /// Creates a manager using the system wall clock.
    ///
    /// Nothing is read until [`initialize`](Self::initialize) is called.
    pub fn new(store: S, backend: B, config: SessionConfig) -> Self {
        Self::with_clock(store, backend, config, SystemClock)
    }

    /// Creates a manager with an explicit clock.
    pub fn with_clock(store: S, backend: B, config: SessionConfig, clock: impl Clock) -> Self {
        let config = config.validated();
        let (phase_tx, _) = watch::channel(SessionPhase::Uninitialized);
        let (events_tx, _) = broadcast::channel(config.event_capacity);

        Self {
            core: Arc::new(Core {
                store,
                backend,
                clock: Arc::new(clock),
                config,
                inner: Mutex::new(Inner {
                    phase: SessionPhase::Uninitialized,
                    generation: 0,
                    renewal: None,
                    last_error: None,
                    load_error: None,
                }),
                phase_tx,
                events_tx,
                init: OnceLock::new(),
                store_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // =====================================================================
    // Loading
    // =====================================================================

    /// Loads the persisted session and settles the initial state.
    ///
    /// Idempotent. Concurrent callers share one load (one store read) and
    /// all get its result. If the persisted session has expired it is
    /// renewed before this returns. The load runs in its own task, so a
    /// caller that gives up early doesn't stop it.
    pub async fn initialize(&self) -> SessionLoadState {
        let load = self
            .core
            .init
            .get_or_init(|| {
                let worker = self.clone();
                tokio::spawn(async move { worker.load().await })
                    .map(|joined| {
                        if let Err(err) = joined {
                            error!(error = %err, "session load task died");
                        }
                    })
                    .boxed()
                    .shared()
            })
            .clone();
        load.await;
        self.load_state()
    }

    async fn load(&self) {
        let generation = {
            let mut inner = self.core.lock();
            if !matches!(inner.phase, SessionPhase::Uninitialized) {
                debug!(phase = inner.phase.name(), "session settled before initialize, skipping load");
                return;
            }
            self.core.transition(&mut inner, SessionPhase::Loading);
            inner.generation
        };

        let loaded = self.core.store.load().await;
        let now = self.core.clock.now_millis();

        match loaded {
            Ok(Some(session)) if !session.is_expired_at(now) => {
                let mut inner = self.core.lock();
                if inner.generation != generation {
                    return;
                }
                info!(
                    user_id = %session.user.id,
                    expires_in_secs = session.expires_in(now).as_secs(),
                    "restored persisted session"
                );
                self.core.transition(&mut inner, SessionPhase::Authenticated(session));
            }
            Ok(Some(session)) => {
                info!(user_id = %session.user.id, "persisted session expired, renewing before use");
                let renewal = {
                    let mut inner = self.core.lock();
                    if inner.generation != generation {
                        return;
                    }
                    self.begin_renewal(&mut inner, session, RenewalOrigin::Startup)
                };
                renewal.await;
            }
            Ok(None) => {
                info!("no persisted session");
                self.settle_signed_out(generation, None);
            }
            Err(err) if err.is_corrupt() => {
                warn!(error = %err, "discarding corrupt persisted session");
                self.settle_signed_out(generation, None);
                self.clear_store(generation).await;
            }
            Err(err) => {
                warn!(error = %err, "session store unreadable, starting signed out");
                self.settle_signed_out(generation, Some(SessionError::StoreRead(err.to_string())));
            }
        }
    }

    fn settle_signed_out(&self, generation: u64, load_error: Option<SessionError>) {
        let mut inner = self.core.lock();
        if inner.generation != generation {
            return;
        }
        inner.last_error = load_error.clone();
        inner.load_error = load_error;
        self.core.transition(&mut inner, SessionPhase::Unauthenticated);
    }

    // =====================================================================
    // Renewal
    // =====================================================================

    /// Renews the held session if it has expired.
    ///
    /// Does nothing unless the manager is authenticated with an expired
    /// session. If a renewal is already running this joins it rather than
    /// starting another. While renewing, consumers keep seeing the previous
    /// session.
    pub async fn renew_if_expired(&self) -> RenewalOutcome {
        let renewal = {
            let mut inner = self.core.lock();
            if let Some(in_flight) = &inner.renewal {
                debug!("joining in-flight renewal");
                in_flight.clone()
            } else {
                let now = self.core.clock.now_millis();
                let expired = match &inner.phase {
                    SessionPhase::Authenticated(session) if session.is_expired_at(now) => {
                        Some(session.clone())
                    }
                    _ => None,
                };
                let Some(previous) = expired else {
                    return RenewalOutcome::NotNeeded;
                };
                info!(user_id = %previous.user.id, "session expired, renewing");
                self.begin_renewal(&mut inner, previous, RenewalOrigin::Foreground)
            }
        };
        renewal.await
    }

    /// Hook for the app entering the foreground.
    pub async fn on_app_foreground(&self) -> RenewalOutcome {
        debug!("app entered foreground");
        self.renew_if_expired().await
    }

    /// Enters `Renewing` and spawns the renewal task. Caller holds the lock.
    fn begin_renewal(
        &self,
        inner: &mut Inner,
        previous: Session,
        origin: RenewalOrigin,
    ) -> RenewalFuture {
        let generation = inner.generation;
        self.core.transition(
            inner,
            SessionPhase::Renewing {
                previous: previous.clone(),
                origin,
            },
        );
        self.core.emit(SessionEvent::RenewalStarted { origin });

        let worker = self.clone();
        let handle =
            tokio::spawn(async move { worker.run_renewal(generation, previous, origin).await });

        let watcher = self.clone();
        let renewal = handle
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    error!(error = %err, "renewal task died");
                    watcher.abandon_renewal(generation);
                    RenewalOutcome::Aborted
                })
            })
            .boxed()
            .shared();

        inner.renewal = Some(renewal.clone());
        renewal
    }

    async fn run_renewal(
        &self,
        generation: u64,
        previous: Session,
        origin: RenewalOrigin,
    ) -> RenewalOutcome {
        match self.request_renewal(generation, &previous).await {
            Ok(fresh) => self.commit_renewal(generation, previous, fresh, origin).await,
            Err(SessionError::Superseded) => {
                debug!("renewal abandoned, session was replaced");
                RenewalOutcome::Superseded
            }
            Err(err) => self.fail_renewal(generation, err).await,
        }
    }

    /// Asks the backend for a new session, retrying transient failures.
    async fn request_renewal(
        &self,
        generation: u64,
        previous: &Session,
    ) -> Result<Session, SessionError> {
        let policy = &self.core.config.renewal;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let attempt =
                tokio::time::timeout(policy.timeout(), self.core.backend.renew(&previous.refresh_token))
                    .await;

            let failure = match attempt {
                Ok(Ok(fresh)) => return self.accept_renewed(fresh),
                Ok(Err(err)) if !err.is_retryable() => {
                    warn!(user_id = %previous.user.id, reason = err.reason(), "refresh token rejected");
                    return Err(SessionError::RenewalRejected(err.to_string()));
                }
                Ok(Err(err)) => err.to_string(),
                Err(_) => format!("no response within {}ms", policy.timeout_ms),
            };

            if attempts > policy.max_retries {
                warn!(attempts, error = %failure, "session renewal retries exhausted");
                return Err(SessionError::RenewalNetwork {
                    attempts,
                    detail: failure,
                });
            }
            if !self.core.is_current(generation) {
                return Err(SessionError::Superseded);
            }

            let delay = policy.backoff(attempts);
            warn!(
                attempt = attempts,
                error = %failure,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "session renewal attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;

            if !self.core.is_current(generation) {
                return Err(SessionError::Superseded);
            }
        }
    }

    /// Validates a backend response before it may become the session.
    fn accept_renewed(&self, fresh: Session) -> Result<Session, SessionError> {
        if let Some(field) = fresh.missing_field() {
            warn!(field, "renewal response is missing a field");
            return Err(SessionError::RenewalRejected(format!(
                "renewal response has empty {field}"
            )));
        }
        let now = self.core.clock.now_millis();
        if fresh.is_expired_at(now) {
            warn!(expires_at = fresh.expires_at, now, "renewal response already expired");
            return Err(SessionError::InvalidExpiry {
                expires_at: fresh.expires_at,
                now,
            });
        }
        Ok(fresh)
    }

    async fn commit_renewal(
        &self,
        generation: u64,
        previous: Session,
        fresh: Session,
        origin: RenewalOrigin,
    ) -> RenewalOutcome {
        let _gate = self.core.store_gate.lock().await;
        if !self.core.is_current(generation) {
            debug!("discarding renewed session, session was replaced");
            return RenewalOutcome::Superseded;
        }

        if let Err(err) = self.core.store.save(&fresh).await {
            error!(user_id = %fresh.user.id, error = %err, "failed to persist renewed session");
            let err = SessionError::StoreWrite(err.to_string());
            return match origin {
                // Keep what consumers already have; memory and store still agree.
                RenewalOrigin::Foreground => self.retain_previous(generation, previous, err),
                RenewalOrigin::Startup => {
                    self.clear_store_locked().await;
                    self.finish_signed_out(generation, err)
                }
            };
        }

        let event = SessionEvent::Renewed {
            user_id: fresh.user.id.clone(),
            expires_at: fresh.expires_at,
        };
        {
            let mut inner = self.core.lock();
            if inner.generation != generation {
                // A logout is waiting on the gate and will clear the store.
                return RenewalOutcome::Superseded;
            }
            info!(user_id = %fresh.user.id, expires_at = fresh.expires_at, "session renewed");
            inner.renewal = None;
            inner.last_error = None;
            inner.load_error = None;
            self.core.transition(&mut inner, SessionPhase::Authenticated(fresh));
        }
        self.core.emit(event);
        RenewalOutcome::Renewed
    }

    async fn fail_renewal(&self, generation: u64, err: SessionError) -> RenewalOutcome {
        let _gate = self.core.store_gate.lock().await;
        if !self.core.is_current(generation) {
            return RenewalOutcome::Superseded;
        }
        self.clear_store_locked().await;
        self.finish_signed_out(generation, err)
    }

    fn finish_signed_out(&self, generation: u64, err: SessionError) -> RenewalOutcome {
        let reason = SignOutReason::for_error(&err);
        {
            let mut inner = self.core.lock();
            if inner.generation != generation {
                return RenewalOutcome::Superseded;
            }
            warn!(?reason, error = %err, "session ended by failed renewal");
            inner.renewal = None;
            inner.last_error = Some(err);
            self.core.transition(&mut inner, SessionPhase::Unauthenticated);
        }
        self.core.emit(SessionEvent::SignedOut { reason });
        RenewalOutcome::SignedOut(reason)
    }

    fn retain_previous(
        &self,
        generation: u64,
        previous: Session,
        err: SessionError,
    ) -> RenewalOutcome {
        {
            let mut inner = self.core.lock();
            if inner.generation != generation {
                return RenewalOutcome::Superseded;
            }
            inner.renewal = None;
            inner.last_error = Some(err.clone());
            self.core.transition(&mut inner, SessionPhase::Authenticated(previous));
        }
        self.core.emit(SessionEvent::RenewalFailed { error: err });
        RenewalOutcome::Retained
    }

    /// Restores a settled phase after the renewal task panicked.
    fn abandon_renewal(&self, generation: u64) {
        let mut inner = self.core.lock();
        if inner.generation != generation {
            return;
        }
        let next = match &inner.phase {
            SessionPhase::Renewing {
                previous,
                origin: RenewalOrigin::Foreground,
            } => SessionPhase::Authenticated(previous.clone()),
            SessionPhase::Renewing {
                origin: RenewalOrigin::Startup,
                ..
            } => SessionPhase::Unauthenticated,
            _ => return,
        };
        inner.renewal = None;
        self.core.transition(&mut inner, next);
    }

    // =====================================================================
    // Sign-in / logout
    // =====================================================================

    /// Adopts a session obtained by the login flow.
    ///
    /// The session is persisted before it becomes visible. Any renewal in
    /// flight for an older session is discarded.
    ///
    /// # Errors
    /// - [`SessionError::InvalidExpiry`]: `expires_at` is not in the future
    /// - [`SessionError::StoreWrite`]: it couldn't be persisted (including
    ///   incomplete sessions); in-memory state is unchanged
    pub async fn sign_in(&self, session: Session) -> Result<(), SessionError> {
        let now = self.core.clock.now_millis();
        if session.is_expired_at(now) {
            return Err(SessionError::InvalidExpiry {
                expires_at: session.expires_at,
                now,
            });
        }

        let _gate = self.core.store_gate.lock().await;
        if let Err(err) = self.core.store.save(&session).await {
            error!(user_id = %session.user.id, error = %err, "failed to persist signed-in session");
            return Err(SessionError::StoreWrite(err.to_string()));
        }

        let user_id = session.user.id.clone();
        {
            let mut inner = self.core.lock();
            inner.generation += 1;
            inner.renewal = None;
            inner.last_error = None;
            inner.load_error = None;
            self.core.transition(&mut inner, SessionPhase::Authenticated(session));
        }
        info!(%user_id, "signed in");
        self.core.emit(SessionEvent::SignedIn { user_id });
        Ok(())
    }

    /// Signs the user out.
    ///
    /// Local state is cleared before anything else, so this always succeeds
    /// locally. The remote revoke afterwards is best effort: its failure is
    /// logged, never returned. Calling this while already signed out does
    /// nothing. A `sign_in` that persists its session first wins: the
    /// logout then neither emits `SignedOut` nor revokes.
    pub async fn logout(&self) {
        let (generation, previous) = {
            let mut inner = self.core.lock();
            if matches!(inner.phase, SessionPhase::Unauthenticated) {
                debug!("logout while signed out, nothing to do");
                return;
            }
            inner.generation += 1;
            inner.renewal = None;
            inner.last_error = None;
            let previous = inner.phase.held_session().cloned();
            self.core.transition(&mut inner, SessionPhase::Unauthenticated);
            (inner.generation, previous)
        };

        match &previous {
            Some(session) => info!(user_id = %session.user.id, "logging out"),
            None => info!("logging out before a session was loaded"),
        }
        if !self.clear_store(generation).await {
            // A sign-in took over while this logout waited for the store.
            return;
        }
        self.core.emit(SessionEvent::SignedOut {
            reason: SignOutReason::Logout,
        });

        if let Some(session) = previous {
            if let Err(err) = self.core.backend.revoke(&session).await {
                warn!(user_id = %session.user.id, error = %err, "remote session invalidation failed");
            }
        }
    }

    /// Clears the store unless the session was replaced meanwhile.
    ///
    /// Returns `false` if it was replaced and nothing was cleared.
    async fn clear_store(&self, generation: u64) -> bool {
        let _gate = self.core.store_gate.lock().await;
        if !self.core.is_current(generation) {
            debug!("skipping store clear, session was replaced");
            return false;
        }
        self.clear_store_locked().await;
        true
    }

    /// Clears the store. Caller holds the store gate.
    async fn clear_store_locked(&self) {
        if let Err(err) = self.core.store.clear().await {
            error!(error = %err, "failed to clear persisted session");
        }
    }

    // =====================================================================
    // Observation
    // =====================================================================

    /// The session consumers may use right now.
    ///
    /// In-memory only. `None` until initialization has settled; during a
    /// foreground renewal this is the previous session.
    pub fn current_session(&self) -> Option<Session> {
        self.core.lock().phase.visible_session().cloned()
    }

    pub fn phase(&self) -> SessionPhase {
        self.core.lock().phase.clone()
    }

    /// UI gating view of the current phase.
    pub fn load_state(&self) -> SessionLoadState {
        let inner = self.core.lock();
        match &inner.phase {
            SessionPhase::Uninitialized => SessionLoadState::Uninitialized,
            SessionPhase::Loading
            | SessionPhase::Renewing {
                origin: RenewalOrigin::Startup,
                ..
            } => SessionLoadState::Loading,
            SessionPhase::Authenticated(session)
            | SessionPhase::Renewing {
                previous: session,
                origin: RenewalOrigin::Foreground,
            } => SessionLoadState::Ready(Some(session.clone())),
            SessionPhase::Unauthenticated => match &inner.load_error {
                Some(err) => SessionLoadState::Error(err.clone()),
                None => SessionLoadState::Ready(None),
            },
        }
    }

    /// Most recent error worth showing the user, if any.
    pub fn last_error(&self) -> Option<SessionError> {
        self.core.lock().last_error.clone()
    }

    /// Subscribes to phase changes. The receiver starts at the current phase.
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.core.phase_tx.subscribe()
    }

    /// Subscribes to discrete session events from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.core.events_tx.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    /// Current wall-clock time as seen by this manager.
    pub fn now_millis(&self) -> i64 {
        self.core.clock.now_millis()
    }
}

// =========================================================================
// Tests
// =========================================================================
