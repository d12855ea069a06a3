//! Integration tests for lifecycle signal handling.
//!
//! Monitor tests use `start_paused` so interval timers resolve instantly.
//! The tests that hold a renewal open against a real `SessionManager` run
//! on real time.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gonet_lifecycle::{
    ForegroundHandler, LifecycleConfig, LifecycleEvent, LifecycleMonitor, LifecycleSignal,
    Visibility,
};
use gonet_session::{
    ManualClock, RenewalBackend, RenewalError, Session, SessionConfig, SessionManager,
    SessionPhase, User,
};
use gonet_store::{JsonRecordCodec, KeyedSessionStore, MemoryStore};
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Clone, Default)]
struct CountingHandler {
    foregrounds: Arc<AtomicUsize>,
    checks: Arc<AtomicUsize>,
}

impl CountingHandler {
    fn foregrounds(&self) -> usize {
        self.foregrounds.load(Ordering::SeqCst)
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ForegroundHandler for CountingHandler {
    async fn on_foreground(&self) {
        self.foregrounds.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_expiry_check(&self) {
        self.checks.fetch_add(1, Ordering::SeqCst);
    }
}

fn config(interval_ms: u64) -> LifecycleConfig {
    LifecycleConfig {
        expiry_check_interval_ms: interval_ms,
        ..LifecycleConfig::default()
    }
}

fn spawn_monitor<H: ForegroundHandler + Clone>(
    config: LifecycleConfig,
    handler: H,
) -> (LifecycleSignal, oneshot::Sender<()>, JoinHandle<()>) {
    let (signal, events) = LifecycleSignal::channel(config.signal_capacity);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(LifecycleMonitor::new(config).run(handler, events, shutdown_rx));
    (signal, shutdown_tx, task)
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

fn session(refresh: &str, expires_at: i64) -> Session {
    Session {
        user: User {
            id: "u-1".into(),
            name: "Ana Quispe".into(),
            email: "ana@gonet.example".into(),
        },
        access_token: format!("access-{refresh}"),
        refresh_token: refresh.into(),
        expires_at,
    }
}

/// Always renews to `fresh`, optionally parking each call until released.
#[derive(Clone)]
struct RenewTo {
    fresh: Session,
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
}

impl RenewTo {
    fn new(fresh: Session) -> Self {
        Self {
            fresh,
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    fn gated(fresh: Session) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(fresh)
        }
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenewalBackend for RenewTo {
    async fn renew(&self, _refresh_token: &str) -> Result<Session, RenewalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        Ok(self.fresh.clone())
    }

    async fn revoke(&self, _session: &Session) -> Result<(), RenewalError> {
        Ok(())
    }
}

type Manager = SessionManager<KeyedSessionStore<MemoryStore, JsonRecordCodec>, RenewTo>;

fn manager(backend: RenewTo, clock: ManualClock) -> Manager {
    SessionManager::with_clock(
        KeyedSessionStore::json(MemoryStore::new()),
        backend,
        SessionConfig::default(),
        clock,
    )
}

// =========================================================================
// observe
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_observe_duplicate_foreground_ignored() {
    let mut monitor = LifecycleMonitor::new(LifecycleConfig::default());

    assert!(!monitor.observe(LifecycleEvent::EnteredForeground));
    assert_eq!(monitor.foreground_triggers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_observe_background_then_foreground_triggers() {
    let mut monitor = LifecycleMonitor::new(LifecycleConfig::default());

    assert!(!monitor.observe(LifecycleEvent::EnteredBackground));
    assert_eq!(monitor.visibility(), Visibility::Background);
    assert!(monitor.observe(LifecycleEvent::EnteredForeground));
    assert_eq!(monitor.visibility(), Visibility::Foreground);
}

#[tokio::test(start_paused = true)]
async fn test_observe_start_in_background_first_foreground_triggers() {
    let mut monitor = LifecycleMonitor::new(LifecycleConfig {
        start_in_foreground: false,
        ..LifecycleConfig::default()
    });

    assert!(monitor.observe(LifecycleEvent::EnteredForeground));
}

#[tokio::test(start_paused = true)]
async fn test_observe_flapping_within_debounce_dropped() {
    let mut monitor = LifecycleMonitor::new(LifecycleConfig::default());

    monitor.observe(LifecycleEvent::EnteredBackground);
    assert!(monitor.observe(LifecycleEvent::EnteredForeground));

    tokio::time::advance(Duration::from_millis(100)).await;
    monitor.observe(LifecycleEvent::EnteredBackground);
    assert!(!monitor.observe(LifecycleEvent::EnteredForeground));

    tokio::time::advance(Duration::from_millis(500)).await;
    monitor.observe(LifecycleEvent::EnteredBackground);
    assert!(monitor.observe(LifecycleEvent::EnteredForeground));

    assert_eq!(monitor.foreground_triggers(), 2);
}

// =========================================================================
// wait_for_check
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_check_fires_after_interval() {
    let mut monitor = LifecycleMonitor::new(config(30_000));
    let start = Instant::now();

    monitor.wait_for_check().await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    assert_eq!(monitor.expiry_checks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_check_pends_in_background() {
    let mut monitor = LifecycleMonitor::new(config(1_000));
    monitor.observe(LifecycleEvent::EnteredBackground);

    let result = tokio::time::timeout(Duration::from_secs(600), monitor.wait_for_check()).await;

    assert!(result.is_err(), "no checks while backgrounded");
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_check_disabled_pends() {
    let mut monitor = LifecycleMonitor::new(config(0));

    let result = tokio::time::timeout(Duration::from_secs(600), monitor.wait_for_check()).await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_check_after_resume_waits_full_interval() {
    let mut monitor = LifecycleMonitor::new(config(30_000));
    tokio::time::advance(Duration::from_secs(20)).await;
    monitor.observe(LifecycleEvent::EnteredBackground);
    tokio::time::advance(Duration::from_secs(60)).await;
    monitor.observe(LifecycleEvent::EnteredForeground);
    let resumed = Instant::now();

    monitor.wait_for_check().await;

    assert!(resumed.elapsed() >= Duration::from_secs(30));
    assert_eq!(monitor.expiry_checks(), 1, "missed checks are not replayed");
}

// =========================================================================
// run
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_foreground_transition_calls_handler_once() {
    let handler = CountingHandler::default();
    let (signal, _shutdown, _task) = spawn_monitor(config(0), handler.clone());

    assert!(signal.entered_background());
    assert!(signal.entered_foreground());
    assert!(signal.entered_foreground());

    wait_for(|| handler.foregrounds() == 1).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handler.foregrounds(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_periodic_checks_while_foreground() {
    let handler = CountingHandler::default();
    let (_signal, _shutdown, _task) = spawn_monitor(config(1_000), handler.clone());

    tokio::time::sleep(Duration::from_millis(3_500)).await;

    assert_eq!(handler.checks(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_no_periodic_checks_while_background() {
    let handler = CountingHandler::default();
    let (signal, _shutdown, _task) = spawn_monitor(config(1_000), handler.clone());
    signal.notify(LifecycleEvent::EnteredBackground).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(handler.checks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_on_shutdown() {
    let (signal, shutdown, task) = spawn_monitor(config(1_000), CountingHandler::default());

    shutdown.send(()).unwrap();
    task.await.unwrap();

    assert!(signal.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_when_every_signal_dropped() {
    let (signal, _shutdown, task) = spawn_monitor(config(1_000), CountingHandler::default());
    let clone = signal.clone();

    drop(signal);
    drop(clone);

    task.await.unwrap();
}

// =========================================================================
// With a real SessionManager
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_foreground_after_expiry_renews_session() {
    let fresh = session("r2", NOW + HOUR);
    let backend = RenewTo::new(fresh.clone());
    let clock = ManualClock::new(NOW);
    let mgr = manager(backend.clone(), clock.clone());
    mgr.sign_in(session("r1", NOW + 5_000)).await.unwrap();
    let (signal, _shutdown, _task) = spawn_monitor(config(0), mgr.clone());

    signal.entered_background();
    clock.advance_millis(10_000);
    tokio::time::advance(Duration::from_secs(10)).await;
    signal.entered_foreground();

    wait_for(|| mgr.current_session().as_ref() == Some(&fresh)).await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_check_renews_expired_session_in_foreground() {
    let fresh = session("r2", NOW + HOUR);
    let backend = RenewTo::new(fresh.clone());
    let clock = ManualClock::new(NOW);
    let mgr = manager(backend.clone(), clock.clone());
    mgr.sign_in(session("r1", NOW + 5_000)).await.unwrap();
    let (_signal, _shutdown, _task) = spawn_monitor(config(30_000), mgr.clone());

    clock.advance_millis(10_000);
    tokio::time::sleep(Duration::from_secs(31)).await;

    wait_for(|| mgr.current_session().as_ref() == Some(&fresh)).await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_rapid_foregrounds_during_renewal_make_one_call() {
    let fresh = session("r2", NOW + HOUR);
    let backend = RenewTo::gated(fresh.clone());
    let clock = ManualClock::new(NOW);
    let mgr = manager(backend.clone(), clock.clone());
    mgr.sign_in(session("r1", NOW + 5_000)).await.unwrap();
    clock.advance_millis(10_000);

    // No debounce, so both transitions reach the manager.
    let cfg = LifecycleConfig {
        expiry_check_interval_ms: 0,
        debounce_ms: 0,
        ..LifecycleConfig::default()
    };
    let (signal, _shutdown, _task) = spawn_monitor(cfg, mgr.clone());

    signal.entered_background();
    signal.entered_foreground();
    wait_for(|| matches!(mgr.phase(), SessionPhase::Renewing { .. })).await;
    signal.entered_background();
    signal.entered_foreground();
    tokio::time::sleep(Duration::from_millis(50)).await;

    backend.release();

    wait_for(|| mgr.current_session().as_ref() == Some(&fresh)).await;
    assert_eq!(backend.calls(), 1);
}
