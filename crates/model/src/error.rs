use std::error::Error;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was rejected by the model provider as malformed.
    InvalidRequest,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// Any other errors.
    Other,
}

/// An error raised by a model provider or one of its responses.
///
/// The agent surfaces these as turn failures. [`ErrorKind`] lets callers
/// tell a throttled provider from a rejected conversation.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
