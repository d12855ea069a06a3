use std::future::Future;

use gonet_session::{RenewalBackend, SessionManager};
use gonet_store::SessionStore;
use tracing::debug;

/// What the lifecycle monitor calls into.
///
/// Implemented for [`SessionManager`]; tests substitute counters.
pub trait ForegroundHandler: Send + Sync + 'static {
    /// The app just came to the foreground.
    fn on_foreground(&self) -> impl Future<Output = ()> + Send;

    /// The periodic expiry check interval elapsed.
    fn on_expiry_check(&self) -> impl Future<Output = ()> + Send;
}

impl<S: SessionStore, B: RenewalBackend> ForegroundHandler for SessionManager<S, B> {
    async fn on_foreground(&self) {
        let outcome = self.on_app_foreground().await;
        debug!(?outcome, "foreground expiry check finished");
    }

    async fn on_expiry_check(&self) {
        let outcome = self.renew_if_expired().await;
        debug!(?outcome, "periodic expiry check finished");
    }
}
