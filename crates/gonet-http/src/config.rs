use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Where the auth API lives and how long to wait for it.
///
/// `base_url` is required; everything else has a default, so a config file
/// can be as small as:
///
/// ```toml
/// base_url = "https://api.gonet.example/v1/"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBackendConfig {
    pub base_url: Url,

    /// Renewal endpoint, relative to `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Revocation endpoint, relative to `base_url`.
    #[serde(default = "default_revoke_path")]
    pub revoke_path: String,

    /// Client-side cap on a whole request. The session manager applies its
    /// own per-attempt timeout on top.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_refresh_path() -> String {
    "auth/refresh".into()
}

fn default_revoke_path() -> String {
    "auth/logout".into()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl HttpBackendConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: default_refresh_path(),
            revoke_path: default_revoke_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn refresh_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(&self.refresh_path)
    }

    pub fn revoke_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(&self.revoke_path)
    }

    /// Resolves `path` below `base_url`, whether or not the base ends in `/`.
    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(path.trim_start_matches('/'))
    }
}
