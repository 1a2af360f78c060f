/// Error type for [`BackendClient`](crate::BackendClient).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client was configured with missing or malformed values.
    #[error("invalid backend configuration: {0}")]
    Config(String),
    /// The request path could not be resolved against the base URL.
    #[error("invalid request path {0:?}")]
    InvalidPath(String),
    /// The backend answered with a non-success status other than 429.
    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The leading part of the response body.
        body: String,
    },
    /// The backend answered with HTTP 429.
    #[error("backend rate limit exceeded (HTTP 429)")]
    RateLimited,
    /// The request never got a complete response.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The response body was not valid JSON.
    #[error("invalid JSON in backend response: {0}")]
    Decode(#[source] serde_json::Error),
    /// Every attempt in the retry budget failed.
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The error observed on the final attempt.
        #[source]
        last: Box<Error>,
    },
}

impl Error {
    /// Returns `true` if the request may succeed when tried again.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RateLimited | Error::Network(_))
    }
}
