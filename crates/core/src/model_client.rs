use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use app_insight_model::{
    ContentBlock, ErrorKind, Message, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent, Role,
    ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
pub type OnStreamEvent = Box<dyn Fn(StreamEvent) + Send + 'static>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, OnStreamEvent) -> BoxedSendRequestFuture + Send + Sync
>;

/// A progress notification observed while a response is streaming in.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// A fragment of assistant text.
    MessageDelta(String),
    /// A tool invocation has been fully received.
    ToolCall(ToolCallRequest),
}

/// The response stream ran out before the model reported completion.
///
/// Whatever arrived is discarded, since a half-received message may carry
/// tool invocations that were never meant to run.
#[derive(Debug, thiserror::Error)]
#[error("model response ended before completion")]
pub struct IncompleteResponse;

impl ModelProviderError for IncompleteResponse {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_event| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_event).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and drains the response.
    ///
    /// `on_event` observes text fragments and tool calls as they arrive.
    /// The returned response holds the same content, assembled into a
    /// single assistant message.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_event: impl Fn(StreamEvent) + Send + 'static,
    ) -> SendRequestResult {
        (self.handler_fn)(req, Box::new(on_event)).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The assistant message, blocks in generation order.
    pub message: Message,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: ModelFinishReason,
}

impl ModelClientResponse {
    /// Returns `true` if the model stopped to have tools run.
    #[inline]
    pub fn wants_tools(&self) -> bool {
        self.finish_reason == ModelFinishReason::ToolCalls
            && !self.tool_calls.is_empty()
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_event: OnStreamEvent,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut blocks: Vec<ContentBlock> = Vec::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                // Consecutive deltas belong to the same text block.
                match blocks.last_mut() {
                    Some(ContentBlock::Text { text }) => text.push_str(&delta),
                    _ => blocks.push(ContentBlock::Text {
                        text: delta.clone(),
                    }),
                }
                on_event(StreamEvent::MessageDelta(delta));
            }
            ModelResponseEvent::ToolCall(req) => {
                blocks.push(ContentBlock::ToolUse {
                    id: req.id.clone(),
                    name: req.name.clone(),
                    input: req.arguments.clone(),
                });
                on_event(StreamEvent::ToolCall(req.clone()));
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    let Some(finish_reason) = finish_reason else {
        warn!("response ended after {} blocks without completion", blocks.len());
        return Err(Box::new(IncompleteResponse));
    };
    trace!("finished a request");

    Ok(ModelClientResponse {
        message: Message::with_blocks(Role::Assistant, blocks),
        tool_calls,
        finish_reason,
    })
}
