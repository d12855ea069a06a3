/// Errors building an [`HttpRenewalBackend`](crate::HttpRenewalBackend).
///
/// Request-time failures are not reported here; they become
/// [`RenewalError`](gonet_session::RenewalError)s.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// An endpoint URL could not be built from the configured base and path.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}
