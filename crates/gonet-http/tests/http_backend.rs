//! Integration tests for the HTTP auth backend against a local axum server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use gonet_http::{HttpBackendConfig, HttpRenewalBackend};
use gonet_session::{RenewalBackend, RenewalError, Session, User};
use serde_json::{Value, json};
use url::Url;

// =========================================================================
// Helpers
// =========================================================================

async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/").parse().unwrap()
}

fn backend(base_url: Url) -> HttpRenewalBackend {
    HttpRenewalBackend::new(&HttpBackendConfig::new(base_url)).unwrap()
}

fn session_json(refresh: &str) -> Value {
    json!({
        "user": { "id": "u-1", "name": "Ana Quispe", "email": "ana@gonet.example" },
        "accessToken": format!("access-{refresh}"),
        "refreshToken": refresh,
        "expiresAt": 1_700_003_600_000_i64,
    })
}

fn session() -> Session {
    Session {
        user: User {
            id: "u-1".into(),
            name: "Ana Quispe".into(),
            email: "ana@gonet.example".into(),
        },
        access_token: "access-r1".into(),
        refresh_token: "r1".into(),
        expires_at: 1_700_000_000_000,
    }
}

fn refresh_replying(status: StatusCode, body: Value) -> Router {
    Router::new().route(
        "/api/auth/refresh",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    )
}

// =========================================================================
// renew
// =========================================================================

#[tokio::test]
async fn test_renew_success_returns_session() {
    let router = Router::new().route(
        "/api/auth/refresh",
        post(|Json(req): Json<Value>| async move {
            let token = req["refreshToken"].as_str().unwrap_or_default().to_owned();
            Json(session_json(&format!("{token}-next")))
        }),
    );
    let backend = backend(serve(router).await);

    let renewed = backend.renew("r1").await.unwrap();

    assert_eq!(renewed.refresh_token, "r1-next");
    assert_eq!(renewed.access_token, "access-r1-next");
    assert_eq!(renewed.user.email, "ana@gonet.example");
    assert_eq!(renewed.expires_at, 1_700_003_600_000);
}

#[tokio::test]
async fn test_renew_unauthorized_is_rejected_with_error_detail() {
    let router = refresh_replying(
        StatusCode::UNAUTHORIZED,
        json!({ "error": "expired_refresh_token" }),
    );
    let backend = backend(serve(router).await);

    let err = backend.renew("r1").await.unwrap_err();

    assert_eq!(err, RenewalError::Rejected("expired_refresh_token".into()));
    assert_eq!(err.reason(), "expired_refresh_token");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_renew_bad_request_and_forbidden_are_rejected() {
    for status in [StatusCode::BAD_REQUEST, StatusCode::FORBIDDEN] {
        let backend = backend(serve(refresh_replying(status, json!({}))).await);

        let err = backend.renew("r1").await.unwrap_err();

        assert!(matches!(err, RenewalError::Rejected(_)), "{status}");
    }
}

#[tokio::test]
async fn test_renew_server_failure_is_retryable() {
    let router = refresh_replying(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "maintenance" }),
    );
    let backend = backend(serve(router).await);

    let err = backend.renew("r1").await.unwrap_err();

    assert_eq!(err, RenewalError::Server("maintenance".into()));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_renew_body_reason_overrides_status() {
    let router = refresh_replying(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "expired_refresh_token" }),
    );
    let backend = backend(serve(router).await);

    let err = backend.renew("r1").await.unwrap_err();

    assert_eq!(err, RenewalError::Rejected("expired_refresh_token".into()));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_renew_body_server_error_reason_on_client_status_is_retryable() {
    let router = refresh_replying(StatusCode::BAD_REQUEST, json!({ "error": "server_error" }));
    let backend = backend(serve(router).await);

    let err = backend.renew("r1").await.unwrap_err();

    assert_eq!(err, RenewalError::Server("server_error".into()));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_renew_undecodable_body_is_server_error() {
    let router = refresh_replying(StatusCode::OK, json!({ "token": "nope" }));
    let backend = backend(serve(router).await);

    let err = backend.renew("r1").await.unwrap_err();

    assert!(matches!(err, RenewalError::Server(_)));
}

#[tokio::test]
async fn test_renew_connection_refused_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = backend(format!("http://{addr}/").parse().unwrap());

    let err = backend.renew("r1").await.unwrap_err();

    assert!(matches!(err, RenewalError::Network(_)));
    assert_eq!(err.reason(), "network");
}

#[tokio::test]
async fn test_renew_slow_server_times_out_as_network_error() {
    let router = Router::new().route(
        "/api/auth/refresh",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(session_json("late"))
        }),
    );
    let mut config = HttpBackendConfig::new(serve(router).await);
    config.request_timeout_ms = 100;
    let backend = HttpRenewalBackend::new(&config).unwrap();

    let err = backend.renew("r1").await.unwrap_err();

    assert!(matches!(err, RenewalError::Network(_)));
}

// =========================================================================
// revoke
// =========================================================================

#[tokio::test]
async fn test_revoke_sends_bearer_and_refresh_token() {
    let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();
    let router = Router::new()
        .route(
            "/api/auth/logout",
            post(
                |State(seen): State<Arc<Mutex<Vec<(String, Value)>>>>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_owned();
                    seen.lock().unwrap().push((auth, body));
                    StatusCode::NO_CONTENT
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let backend = backend(serve(router).await);

    backend.revoke(&session()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "Bearer access-r1");
    assert_eq!(seen[0].1["refreshToken"], "r1");
}

#[tokio::test]
async fn test_revoke_failure_status_is_error() {
    let router = Router::new().route(
        "/api/auth/logout",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let backend = backend(serve(router).await);

    let err = backend.revoke(&session()).await.unwrap_err();

    assert!(matches!(err, RenewalError::Server(d) if d.contains("500")));
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_new_resolves_endpoints_below_base() {
    let backend = backend("https://api.gonet.example/v2".parse().unwrap());

    assert_eq!(
        backend.refresh_url().as_str(),
        "https://api.gonet.example/v2/auth/refresh"
    );
    assert_eq!(
        backend.revoke_url().as_str(),
        "https://api.gonet.example/v2/auth/logout"
    );
}
