//! The lifecycle signal: how the platform tells us about visibility.

use tokio::sync::mpsc;
use tracing::warn;

/// A visibility change reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    EnteredForeground,
    EnteredBackground,
}

impl LifecycleEvent {
    /// Visibility after this event.
    pub fn visibility(self) -> Visibility {
        match self {
            Self::EnteredForeground => Visibility::Foreground,
            Self::EnteredBackground => Visibility::Background,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Foreground,
    Background,
}

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The monitor has stopped; nobody is listening.
    #[error("lifecycle monitor has stopped")]
    Closed,

    /// The monitor is behind and the buffer is full.
    #[error("lifecycle signal buffer full, dropped {0:?}")]
    Full(LifecycleEvent),
}

/// Cloneable handle for reporting lifecycle events.
///
/// Any number of clones may exist. When the last one is dropped the
/// monitor loop stops.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl LifecycleSignal {
    /// Creates a signal and the receiving end for
    /// [`LifecycleMonitor::run`](crate::LifecycleMonitor::run).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Reports `event`, waiting for buffer space if needed.
    pub async fn notify(&self, event: LifecycleEvent) -> Result<(), SignalError> {
        self.tx.send(event).await.map_err(|_| SignalError::Closed)
    }

    /// Reports `event` without waiting. For synchronous platform callbacks.
    pub fn try_notify(&self, event: LifecycleEvent) -> Result<(), SignalError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => SignalError::Full(event),
            mpsc::error::TrySendError::Closed(_) => SignalError::Closed,
        })
    }

    /// Reports that the app entered the foreground. Returns `false` if the
    /// event could not be delivered.
    pub fn entered_foreground(&self) -> bool {
        self.report(LifecycleEvent::EnteredForeground)
    }

    /// Reports that the app entered the background. Returns `false` if the
    /// event could not be delivered.
    pub fn entered_background(&self) -> bool {
        self.report(LifecycleEvent::EnteredBackground)
    }

    fn report(&self, event: LifecycleEvent) -> bool {
        match self.try_notify(event) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "lifecycle event not delivered");
                false
            }
        }
    }

    /// Returns `true` once the monitor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
