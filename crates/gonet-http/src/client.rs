use gonet_session::{RenewalBackend, RenewalError, Session};
use gonet_store::{JsonRecordCodec, RecordCodec};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{HttpBackendConfig, HttpError};

/// Renews and revokes sessions over HTTP.
///
/// | Response | Result |
/// |---|---|
/// | `2xx` with a session body | `Ok(Session)` |
/// | error body with a known `error` reason | the error for that reason |
/// | `400`, `401`, `403` | `RenewalError::Rejected` |
/// | any other status | `RenewalError::Server` |
/// | `2xx` with an undecodable body | `RenewalError::Server` |
/// | connect failure, client timeout | `RenewalError::Network` |
#[derive(Debug, Clone)]
pub struct HttpRenewalBackend {
    http: reqwest::Client,
    refresh_url: Url,
    revoke_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpRenewalBackend {
    /// Builds a backend with its own connection pool.
    ///
    /// # Errors
    /// [`HttpError::InvalidUrl`] if an endpoint can't be resolved, or
    /// [`HttpError::Client`] if the TLS client can't be set up.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_http_client(config, http)
    }

    /// Builds a backend around an existing client (shared pool, tests).
    pub fn with_http_client(
        config: &HttpBackendConfig,
        http: reqwest::Client,
    ) -> Result<Self, HttpError> {
        Ok(Self {
            http,
            refresh_url: config.refresh_url()?,
            revoke_url: config.revoke_url()?,
        })
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    pub fn revoke_url(&self) -> &Url {
        &self.revoke_url
    }
}

impl RenewalBackend for HttpRenewalBackend {
    async fn renew(&self, refresh_token: &str) -> Result<Session, RenewalError> {
        debug!(url = %self.refresh_url, "requesting session renewal");
        let response = self
            .http
            .post(self.refresh_url.clone())
            .json(&TokenBody { refresh_token })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.bytes().await.map_err(transport_error)?;
        JsonRecordCodec
            .decode(&body)
            .map_err(|err| RenewalError::Server(format!("unreadable renewal response: {err}")))
    }

    async fn revoke(&self, session: &Session) -> Result<(), RenewalError> {
        debug!(url = %self.revoke_url, user_id = %session.user.id, "revoking session");
        let response = self
            .http
            .post(self.revoke_url.clone())
            .bearer_auth(&session.access_token)
            .json(&TokenBody {
                refresh_token: &session.refresh_token,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }
}

fn transport_error(err: reqwest::Error) -> RenewalError {
    RenewalError::Network(err.without_url().to_string())
}

/// Maps a non-success response.
///
/// A known machine-readable reason in the body's `error` field decides the
/// error; otherwise the status code does, with the field kept as detail.
async fn status_error(response: reqwest::Response) -> RenewalError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("HTTP {status}"));

    if let Some(err) = RenewalError::from_reason(&detail, detail.clone()) {
        debug!(%status, reason = err.reason(), "error reason taken from response body");
        return err;
    }
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RenewalError::Rejected(detail)
        }
        _ => RenewalError::Server(detail),
    }
}
