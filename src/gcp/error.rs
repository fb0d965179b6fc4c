use thiserror::Error;

/// A failed call to a Google Cloud REST endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a usable response (DNS, TLS, timeout, bad JSON).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
