use crate::error::ModelProviderError;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An inference service that samples one assistant message per request.
///
/// A request carries the whole submitted conversation, so providers keep
/// no per-conversation state and may be shared by concurrent turns. The
/// returned future must not borrow the provider or the request.
pub trait ModelProvider: Send + Sync {
    /// Error returned when a request cannot be started, and by the
    /// response while it streams.
    type Error: ModelProviderError;

    /// The streamed assistant message.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts sampling a reply to `req`.
    ///
    /// Resolves once the provider has accepted the request. The content
    /// itself is read from the response.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
