//! `SessionRuntime` builder and teardown.
//!
//! Ties the layers together: store → session manager ← lifecycle monitor.
//! Nothing here is global. The host constructs one runtime, passes it (or
//! its manager handle) to whatever needs it, and tears it down explicitly.

use std::sync::Arc;

use gonet_lifecycle::{LifecycleConfig, LifecycleMonitor, LifecycleSignal};
use gonet_session::{
    Clock, RenewalBackend, SessionConfig, SessionLoadState, SessionManager, SystemClock,
};
use gonet_store::SessionStore;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::GonetConfig;

/// Builder for a [`SessionRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = SessionRuntime::builder()
///     .lifecycle_config(LifecycleConfig { debounce_ms: 250, ..Default::default() })
///     .build(store, backend);
/// runtime.initialize().await;
/// ```
pub struct SessionRuntimeBuilder {
    session_config: SessionConfig,
    lifecycle_config: LifecycleConfig,
    clock: Arc<dyn Clock>,
}

impl SessionRuntimeBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            lifecycle_config: LifecycleConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Takes the session and lifecycle sections from a loaded config.
    pub fn config(self, config: &GonetConfig) -> Self {
        self.session_config(config.session.clone())
            .lifecycle_config(config.lifecycle.clone())
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn lifecycle_config(mut self, config: LifecycleConfig) -> Self {
        self.lifecycle_config = config;
        self
    }

    /// Replaces the wall clock used for expiry decisions.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds the manager and starts the lifecycle monitor.
    ///
    /// Must be called from within a Tokio runtime. The persisted session is
    /// not read until [`SessionRuntime::initialize`].
    pub fn build<S, B>(self, store: S, backend: B) -> SessionRuntime<S, B>
    where
        S: SessionStore,
        B: RenewalBackend,
    {
        let manager =
            SessionManager::with_clock(store, backend, self.session_config, self.clock);

        let lifecycle = self.lifecycle_config.validated();
        let (signal, events) = LifecycleSignal::channel(lifecycle.signal_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let monitor = LifecycleMonitor::new(lifecycle);
        let task = tokio::spawn(monitor.run(manager.clone(), events, shutdown_rx));

        debug!("session runtime built");

        SessionRuntime {
            manager,
            signal,
            shutdown: Some(shutdown_tx),
            monitor: Some(task),
        }
    }
}

impl Default for SessionRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running session core: the manager plus its lifecycle monitor.
///
/// Dropping the runtime stops the monitor too, but without waiting for it;
/// prefer [`shutdown`](Self::shutdown).
pub struct SessionRuntime<S, B> {
    manager: SessionManager<S, B>,
    signal: LifecycleSignal,
    shutdown: Option<oneshot::Sender<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl SessionRuntime<(), ()> {
    /// Starts building a runtime. The store and backend types are fixed by
    /// [`SessionRuntimeBuilder::build`].
    pub fn builder() -> SessionRuntimeBuilder {
        SessionRuntimeBuilder::new()
    }
}

impl<S: SessionStore, B: RenewalBackend> SessionRuntime<S, B> {
    /// Loads the persisted session. See [`SessionManager::initialize`].
    pub async fn initialize(&self) -> SessionLoadState {
        let state = self.manager.initialize().await;
        info!(authenticated = state.is_authenticated(), "session runtime ready");
        state
    }

    /// Handle to the session manager. Clone it freely.
    pub fn manager(&self) -> &SessionManager<S, B> {
        &self.manager
    }

    /// Handle for forwarding platform lifecycle callbacks.
    pub fn signal(&self) -> &LifecycleSignal {
        &self.signal
    }

    /// Stops the lifecycle monitor and waits for it to finish.
    ///
    /// The session itself is left as is: a persisted session stays
    /// persisted for the next launch.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.monitor.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "lifecycle monitor ended abnormally");
            }
        }
        info!("session runtime shut down");
    }
}
