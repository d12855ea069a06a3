//! Turns lifecycle events into session checks.
//!
//! The monitor is a small state machine over [`Visibility`]:
//!
//! - `observe()` decides whether a reported event should trigger a
//!   foreground check.
//! - `wait_for_check()` resolves when the next periodic expiry check is due,
//!   and pends forever while backgrounded or when checks are disabled.
//!
//! Both are usable on their own; [`LifecycleMonitor::run`] wires them into a
//! `tokio::select!` loop.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, trace};

use crate::{ForegroundHandler, LifecycleConfig, LifecycleEvent, Visibility};

pub struct LifecycleMonitor {
    config: LifecycleConfig,
    check_interval: Option<Duration>,
    visibility: Visibility,
    /// When the last foreground trigger fired, for debouncing.
    last_trigger: Option<Instant>,
    /// When the next periodic check is due. Kept while backgrounded but
    /// ignored until the next foreground resets it.
    next_check: Option<Instant>,
    foreground_triggers: u64,
    expiry_checks: u64,
}

impl LifecycleMonitor {
    pub fn new(config: LifecycleConfig) -> Self {
        let config = config.validated();
        let check_interval = config.expiry_check_interval();
        let visibility = if config.start_in_foreground {
            Visibility::Foreground
        } else {
            Visibility::Background
        };
        let next_check = check_interval.map(|interval| Instant::now() + interval);

        debug!(
            ?visibility,
            check_interval_ms = config.expiry_check_interval_ms,
            debounce_ms = config.debounce_ms,
            "lifecycle monitor created"
        );

        Self {
            config,
            check_interval,
            visibility,
            last_trigger: None,
            next_check,
            foreground_triggers: 0,
            expiry_checks: 0,
        }
    }

    /// Applies `event` and returns `true` if it should trigger a
    /// foreground check.
    ///
    /// Only a background → foreground transition triggers, and not if the
    /// previous trigger was less than `debounce` ago.
    pub fn observe(&mut self, event: LifecycleEvent) -> bool {
        let next = event.visibility();
        if next == self.visibility {
            trace!(?event, "duplicate lifecycle event ignored");
            return false;
        }
        self.visibility = next;

        match next {
            Visibility::Background => {
                debug!("app in background, expiry checks paused");
                false
            }
            Visibility::Foreground => {
                let now = Instant::now();
                // Checks resume a full interval from now, never in a burst.
                self.next_check = self.check_interval.map(|interval| now + interval);

                let debounced = self
                    .last_trigger
                    .is_some_and(|last| now.saturating_duration_since(last) < self.config.debounce());
                if debounced {
                    debug!("foreground transition within debounce window, dropped");
                    return false;
                }

                self.last_trigger = Some(now);
                self.foreground_triggers += 1;
                debug!(triggers = self.foreground_triggers, "app in foreground");
                true
            }
        }
    }

    /// Resolves when the next periodic expiry check is due.
    ///
    /// Pends forever while backgrounded or when checks are disabled, so it
    /// can sit in a `select!` next to other branches. Cancel safe.
    pub async fn wait_for_check(&mut self) {
        let (next, interval) = match (self.next_check, self.check_interval) {
            (Some(next), Some(interval)) if self.visibility == Visibility::Foreground => {
                (next, interval)
            }
            _ => {
                std::future::pending::<()>().await;
                return;
            }
        };

        time::sleep_until(next).await;

        self.next_check = Some(Instant::now() + interval);
        self.expiry_checks += 1;
        trace!(checks = self.expiry_checks, "expiry check due");
    }

    /// Drives `handler` from `events` until `shutdown` fires or every
    /// [`LifecycleSignal`](crate::LifecycleSignal) is dropped.
    pub async fn run<H>(
        mut self,
        handler: H,
        mut events: mpsc::Receiver<LifecycleEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) where
        H: ForegroundHandler + Clone,
    {
        info!(visibility = ?self.visibility, "lifecycle monitor running");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("lifecycle monitor shutting down");
                    break;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("all lifecycle signals dropped, stopping monitor");
                        break;
                    };
                    if self.observe(event) {
                        let handler = handler.clone();
                        tokio::spawn(async move { handler.on_foreground().await });
                    }
                }

                () = self.wait_for_check() => {
                    let handler = handler.clone();
                    tokio::spawn(async move { handler.on_expiry_check().await });
                }
            }
        }

        info!(
            foreground_triggers = self.foreground_triggers,
            expiry_checks = self.expiry_checks,
            "lifecycle monitor stopped"
        );
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Foreground transitions that triggered a check so far.
    pub fn foreground_triggers(&self) -> u64 {
        self.foreground_triggers
    }

    /// Periodic checks that have come due so far.
    pub fn expiry_checks(&self) -> u64 {
        self.expiry_checks
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}
