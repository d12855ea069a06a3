use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the lifecycle monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How often the held session is checked for expiry while the app is
    /// in the foreground. 0 disables periodic checks; foreground
    /// transitions still trigger one.
    pub expiry_check_interval_ms: u64,

    /// A foreground transition within this window of the previous
    /// triggering one is dropped.
    pub debounce_ms: u64,

    /// Whether the app is considered in the foreground before the first
    /// signal arrives.
    pub start_in_foreground: bool,

    /// Buffered signals before [`LifecycleSignal::try_notify`] reports the
    /// channel full.
    ///
    /// [`LifecycleSignal::try_notify`]: crate::LifecycleSignal::try_notify
    pub signal_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            expiry_check_interval_ms: 30_000,
            debounce_ms: 500,
            start_in_foreground: true,
            signal_capacity: 16,
        }
    }
}

impl LifecycleConfig {
    /// Fix out-of-range values. Called by `LifecycleMonitor::new`.
    pub fn validated(mut self) -> Self {
        if self.signal_capacity == 0 {
            warn!("signal_capacity of 0 is not allowed, using 1");
            self.signal_capacity = 1;
        }
        self
    }

    /// Periodic check interval, or `None` when checks are disabled.
    pub fn expiry_check_interval(&self) -> Option<Duration> {
        (self.expiry_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.expiry_check_interval_ms))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_disables_checks() {
        let cfg = LifecycleConfig {
            expiry_check_interval_ms: 0,
            ..LifecycleConfig::default()
        };

        assert_eq!(cfg.expiry_check_interval(), None);
        assert_eq!(
            LifecycleConfig::default().expiry_check_interval(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_validated_fixes_zero_capacity() {
        let cfg = LifecycleConfig {
            signal_capacity: 0,
            ..LifecycleConfig::default()
        }
        .validated();

        assert_eq!(cfg.signal_capacity, 1);
    }
}
