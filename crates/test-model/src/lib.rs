//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use app_insight_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    finish_reason: ModelFinishReason,
    truncated: bool,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if this.event_idx < this.events.len() {
                let event = match &this.events[this.event_idx] {
                    PresetEvent::MessageDelta(msg) => {
                        ModelResponseEvent::MessageDelta(msg.clone())
                    }
                    PresetEvent::ToolCall(req) => {
                        ModelResponseEvent::ToolCall(req.clone())
                    }
                };
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(event)));
            } else if this.event_idx == this.events.len() && !this.truncated {
                this.event_idx += 1;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    this.finish_reason,
                ))));
            } else {
                // In case this method is called after completion.
                return Poll::Ready(Ok(None));
            }
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct ScriptState {
    next_step: usize,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Responses are handed out in order,
/// one per successful request. If there are no enough steps in the script,
/// an error will be returned, unless the last step is set to repeat.
///
/// Clones share the same script position and request log, so a test can
/// keep a clone around to inspect what the agent sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    repeat_last: bool,
    delay: Option<Duration>,
    state: Arc<Mutex<ScriptState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Keeps answering with the last step once the script runs out.
    #[inline]
    pub fn repeat_last_step(&mut self) {
        self.repeat_last = true;
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed ones.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_state().requests.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(
        &self,
        req: &ModelRequest,
    ) -> Result<TestModelResponse, Error> {
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let step = if state.next_step < self.script.len() {
            &self.script[state.next_step]
        } else if let (true, Some(last)) = (self.repeat_last, self.script.last())
        {
            last
        } else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };

        if let Some(failures) = step.failures {
            if failures == 0 || state.failed_attempts < failures {
                state.failed_attempts += 1;
                return Err(Error {
                    message: "preset failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
        }

        let resp = TestModelResponse {
            events: step.events.clone(),
            finish_reason: if step.has_tool_call() {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            },
            truncated: step.truncated,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        };
        state.next_step += 1;
        state.failed_attempts = 0;
        Ok(resp)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.next_response(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use app_insight_model::{Message, ModelRequest, ModelTool, ToolCallRequest};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ToolCallRequest>, ModelFinishReason) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(reason) => {
                    return (msg, tool_call, reason);
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
            }
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::delta("Hello, "),
            PresetEvent::delta("world!"),
        ]));
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::delta("Sure, "),
            PresetEvent::delta("let me take a look."),
            PresetEvent::tool_call("tool:1", "get_file", json!({ "file_id": "7" })),
        ]));

        let mut req = ModelRequest {
            system: None,
            messages: vec![Message::user("Hi")],
            tools: vec![ModelTool {
                name: "get_file".to_owned(),
                description: "Gets a file".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_id": {
                            "type": "string",
                            "description": "The file to look up"
                        }
                    }
                }),
            }],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert!(tool_call.is_none());
        assert_eq!(reason, ModelFinishReason::Stop);

        req.messages.push(Message::assistant(msg));
        req.messages.push(Message::user("Check file 7"));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, reason) = collect_response(resp).await;
        assert_eq!(msg, "Sure, let me take a look.");
        let tool_call = tool_call.unwrap();
        assert_eq!(tool_call.name, "get_file");
        assert_eq!(tool_call.arguments, json!({ "file_id": "7" }));
        assert_eq!(reason, ModelFinishReason::ToolCalls);

        assert!(provider.send_request(&req).await.is_err());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_truncated_response() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_response_step(
            PresetResponse::with_events([PresetEvent::tool_call(
                "tool:1",
                "list_data_sources",
                json!({}),
            )])
            .with_truncation(),
        );

        let resp = provider.send_request(&ModelRequest::default()).await;
        let mut resp = pin!(resp.unwrap());
        let mut events = Vec::new();
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ModelResponseEvent::ToolCall(_)));
    }

    #[tokio::test]
    async fn test_failures_and_repeat() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_response_step(
            PresetResponse::with_events([PresetEvent::delta("ok")])
                .with_failures(1),
        );
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::delta("again"),
        ]));
        provider.repeat_last_step();

        let req = ModelRequest::default();
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);

        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _, _) = collect_response(resp).await;
        assert_eq!(msg, "ok");
        for _ in 0..3 {
            let resp = provider.send_request(&req).await.unwrap();
            let (msg, _, _) = collect_response(resp).await;
            assert_eq!(msg, "again");
        }
    }
}
