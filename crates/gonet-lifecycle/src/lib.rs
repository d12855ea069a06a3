//! App lifecycle handling for the GoNet session core.
//!
//! The host platform reports when the app enters the foreground or the
//! background. This crate turns those reports into session work:
//!
//! - **Foreground**: a background → foreground transition triggers exactly
//!   one expiry check. Duplicate reports are ignored and rapid flapping is
//!   debounced.
//! - **Periodic expiry checks**: while in the foreground, the held session
//!   is checked every `expiry_check_interval`. Checks pause in the
//!   background.
//!
//! # Integration
//!
//! ```ignore
//! let (signal, events) = LifecycleSignal::channel(config.signal_capacity);
//! let monitor = LifecycleMonitor::new(config);
//! tokio::spawn(monitor.run(manager.clone(), events, shutdown_rx));
//!
//! // From the platform's callbacks:
//! signal.entered_background();
//! signal.entered_foreground();
//! ```
//!
//! Handler calls are spawned, so a slow renewal never holds up event
//! processing. Overlap is harmless: the session manager joins a renewal
//! that is already in flight instead of starting another.

#![allow(async_fn_in_trait)]

mod config;
mod handler;
mod monitor;
mod signal;

pub use config::LifecycleConfig;
pub use handler::ForegroundHandler;
pub use monitor::LifecycleMonitor;
pub use signal::{LifecycleEvent, LifecycleSignal, SignalError, Visibility};
