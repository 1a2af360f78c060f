//! A model provider for the Anthropic Messages API.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use app_insight_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::{Client, StatusCode, header};

pub use config::{AnthropicConfig, AnthropicConfigBuilder};
use io::{Chunks, Sse};
use proto::ErrorResponse;
pub use response::AnthropicResponse;

/// Error type for [`AnthropicProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Anthropic model provider.
///
/// Requests are always streamed. Text arrives as deltas, and each tool
/// call is reported once its input is complete.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    client: Client,
    config: Arc<AnthropicConfig>,
}

impl AnthropicProvider {
    /// Creates a new `AnthropicProvider` with the given configuration.
    #[inline]
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for AnthropicProvider {
    type Error = Error;
    type Response = AnthropicResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send();

        async move {
            let resp = resp_fut
                .await
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!("model request failed with {status}: {body}");
                return Err(status_error(status, &body));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(AnthropicResponse::from_sse(sse))
        }
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let kind = match (status, &parsed) {
        (StatusCode::TOO_MANY_REQUESTS, _) => ErrorKind::RateLimitExceeded,
        (_, Some(resp)) => response::error_kind(&resp.error.kind),
        (StatusCode::BAD_REQUEST, None) => ErrorKind::InvalidRequest,
        _ => ErrorKind::Other,
    };
    let message = match parsed {
        Some(resp) => resp.error.message,
        None => format!("HTTP {status}"),
    };
    Error::new(message, kind)
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use app_insight_model::{
        Message, ModelFinishReason, ModelResponse, ModelResponseEvent,
    };
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        let config = AnthropicConfigBuilder::with_api_key("sk-test")
            .with_base_url(server.uri())
            .with_model("claude-test")
            .build();
        AnthropicProvider::new(config)
    }

    fn request() -> ModelRequest {
        ModelRequest {
            system: Some("Be brief.".to_owned()),
            messages: vec![Message::user("How many data sources?")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_streamed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "system": "Be brief.",
                "stream": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                include_str!("../fixtures/end_turn_response.txt"),
                "text/event-stream",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let resp = provider_for(&server).send_request(&request()).await;
        let mut resp = pin!(resp.map_err(|err| err.to_string()).unwrap());
        let mut text = String::new();
        let mut completed = None;
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    text.push_str(&delta)
                }
                ModelResponseEvent::Completed(reason) => {
                    completed = Some(reason)
                }
                ModelResponseEvent::ToolCall(_) => panic!("unexpected call"),
            }
        }
        assert_eq!(text, "Your app has 3 data sources.");
        assert_eq!(completed, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "type": "error",
                "error": {
                    "type": "rate_limit_error",
                    "message": "Number of request tokens has exceeded your limit."
                }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider.send_request(&request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.message().starts_with("Number of request tokens"));

        let err = provider.send_request(&request()).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "HTTP 400 Bad Request");
    }

    #[tokio::test]
    async fn test_unexpected_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .send_request(&request())
            .await
            .err()
            .unwrap();
        assert!(err.message().starts_with("Unexpected content type"));
    }
}
