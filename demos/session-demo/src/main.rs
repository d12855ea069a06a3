//! Walks one session through its life: sign-in, expiry while in the
//! background, silent renewal on foreground, logout.
//!
//! ```text
//! cargo run -p session-demo                # in-process auth backend
//! cargo run -p session-demo -- gonet.toml  # store and HTTP backend from config
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use gonet::prelude::*;
use gonet::{Clock, SystemClock};
use tracing::info;

/// How long each demo access token stays valid.
const TOKEN_TTL_MS: i64 = 1_500;

// ---------------------------------------------------------------------------
// In-process auth backend
// ---------------------------------------------------------------------------

/// Issues short-lived tokens. Every third renewal hits a network error so
/// the retry path shows up in the logs.
#[derive(Clone, Default)]
struct DemoBackend {
    issued: Arc<AtomicU32>,
}

impl RenewalBackend for DemoBackend {
    async fn renew(&self, refresh_token: &str) -> Result<Session, RenewalError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 3 == 0 {
            return Err(RenewalError::Network("simulated connection reset".into()));
        }
        Ok(demo_session(
            &format!("{refresh_token}.{n}"),
            SystemClock.now_millis() + TOKEN_TTL_MS,
        ))
    }

    async fn revoke(&self, session: &Session) -> Result<(), RenewalError> {
        info!(user_id = %session.user.id, "demo backend revoked refresh token");
        Ok(())
    }
}

fn demo_session(refresh_token: &str, expires_at: i64) -> Session {
    Session {
        user: User {
            id: "demo-1".into(),
            name: "Demo Customer".into(),
            email: "demo@gonet.example".into(),
        },
        access_token: format!("access-{refresh_token}"),
        refresh_token: refresh_token.into(),
        expires_at,
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

async fn run<B: RenewalBackend>(config: &GonetConfig, backend: B) -> Result<(), GonetError> {
    let runtime = SessionRuntime::builder()
        .config(config)
        .build(config.session_store(), backend);

    let mut phases = runtime.manager().subscribe();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = phases.borrow_and_update().name();
            eprintln!("  phase -> {phase}");
        }
    });
    let mut events = runtime.manager().events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            eprintln!("  event: {event:?}");
        }
    });

    let state = runtime.initialize().await;
    eprintln!("startup: authenticated = {}", state.is_authenticated());
    if !state.is_authenticated() {
        runtime
            .manager()
            .sign_in(demo_session("demo-refresh", SystemClock.now_millis() + TOKEN_TTL_MS))
            .await?;
    }

    eprintln!("app goes to the background");
    runtime.signal().entered_background();
    tokio::time::sleep(Duration::from_millis(TOKEN_TTL_MS as u64 + 500)).await;

    eprintln!("app returns to the foreground with an expired token");
    runtime.signal().entered_foreground();
    tokio::time::sleep(Duration::from_secs(2)).await;

    if let Some(session) = runtime.manager().current_session() {
        eprintln!("signed in as {} until {}", session.user.email, session.expires_at);
    }
    if let Some(err) = runtime.manager().last_error() {
        eprintln!("last renewal error: {err}");
    }

    runtime.manager().logout().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    runtime.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => GonetConfig::load(path)?,
        None => GonetConfig::default(),
    };
    gonet::telemetry::init_tracing(&config.logging);

    match &config.http {
        Some(http) => {
            eprintln!("using auth API at {}", http.base_url);
            run(&config, HttpRenewalBackend::new(http)?).await?;
        }
        None => {
            eprintln!("using the in-process demo backend");
            run(&config, DemoBackend::default()).await?;
        }
    }
    Ok(())
}
