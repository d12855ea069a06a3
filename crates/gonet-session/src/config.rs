//! Configuration for the session manager.
//!
//! Retry count, backoff and timeout are explicit configuration here, not
//! decisions made ad hoc at each call site. Durations are stored as
//! milliseconds so the structs deserialize cleanly from TOML.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// RenewalPolicy
// ---------------------------------------------------------------------------

/// How hard to try when renewing a session over the network.
///
/// With the defaults, a renewal gets one initial attempt plus exactly one
/// retry, each bounded by a 10 second timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalPolicy {
    /// Per-attempt timeout. An attempt with no response in this window is a
    /// network failure.
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures (network,
    /// timeout, server error). Rejections are never retried.
    pub max_retries: u32,

    /// Base backoff before the first retry; doubles for each later retry.
    pub backoff_ms: u64,

    /// Upper bound of random jitter added to each backoff, so a fleet of
    /// devices waking at once doesn't retry in lockstep.
    pub backoff_jitter_ms: u64,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 1,
            backoff_ms: 500,
            backoff_jitter_ms: 250,
        }
    }
}

impl RenewalPolicy {
    /// Hard cap on retries. There are no unbounded retry loops.
    pub const MAX_RETRIES: u32 = 5;

    /// Smallest accepted per-attempt timeout.
    pub const MIN_TIMEOUT_MS: u64 = 100;

    /// Clamp out-of-range values so the policy is safe to use.
    ///
    /// - `max_retries` capped to [`Self::MAX_RETRIES`].
    /// - `timeout_ms` raised to at least [`Self::MIN_TIMEOUT_MS`].
    pub fn validated(mut self) -> Self {
        if self.max_retries > Self::MAX_RETRIES {
            warn!(
                max_retries = self.max_retries,
                cap = Self::MAX_RETRIES,
                "max_retries exceeds cap, clamping"
            );
            self.max_retries = Self::MAX_RETRIES;
        }
        if self.timeout_ms < Self::MIN_TIMEOUT_MS {
            warn!(
                timeout_ms = self.timeout_ms,
                min = Self::MIN_TIMEOUT_MS,
                "renewal timeout too small, raising"
            );
            self.timeout_ms = Self::MIN_TIMEOUT_MS;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn base_backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    /// Delay before retry number `retry` (1-based), with random jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let jitter = if self.backoff_jitter_ms > 0 {
            rand::rng().random_range(0..=self.backoff_jitter_ms)
        } else {
            0
        };
        self.base_backoff(retry) + Duration::from_millis(jitter)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for a [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub renewal: RenewalPolicy,

    /// Buffer size of the [`SessionEvent`](crate::SessionEvent) broadcast.
    /// A subscriber that falls further behind than this misses events (the
    /// current phase is always available through `subscribe`).
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            renewal: RenewalPolicy::default(),
            event_capacity: 32,
        }
    }
}

impl SessionConfig {
    /// Clamp and fix out-of-range values. Called by `SessionManager::new`.
    pub fn validated(mut self) -> Self {
        self.renewal = self.renewal.validated();
        if self.event_capacity == 0 {
            self.event_capacity = 1;
        }
        self
    }
}
