// Error types for the match store adapters.

/// Errors raised while reading from or subscribing to a match store.
///
/// Callers treat every variant as "no data available" and keep running in
/// offline mode; none of them are fatal to the presentation layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The embedded SQLite collection failed.
    #[error("sqlite store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP request to the hosted store failed (network, DNS, TLS, ...).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// The hosted store answered with a non-success status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// A snapshot body could not be parsed as a list of match records.
    #[error("failed to decode match snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    /// The push channel of the hosted store reported an error.
    #[error("subscription stream error: {0}")]
    Stream(String),

    /// The store has not been configured with a usable location.
    #[error("store misconfigured: {0}")]
    Misconfigured(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
