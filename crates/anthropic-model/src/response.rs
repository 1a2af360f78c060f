use std::pin::Pin;
use std::task::{Context, Poll, ready};

use app_insight_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;
use serde_json::{Value, json};

use crate::Error;
use crate::io::Sse;
use crate::proto::{BlockDelta, BlockStart, StreamEvent};

/// A content block that is still streaming in.
enum PartialBlock {
    Text,
    ToolUse {
        id: String,
        name: String,
        input_json: String,
    },
    Other,
}

struct PartialState {
    sse: Sse,
    // Indexed by the block index the server assigns.
    blocks: Vec<PartialBlock>,
    stop_reason: Option<String>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(ModelResponseEvent, PartialState), Error>;

pin_project! {
    pub struct AnthropicResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl AnthropicResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            blocks: Vec::new(),
            stop_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for AnthropicResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok(next) => next,
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // Nothing follows the completion event.
        if matches!(event, ModelResponseEvent::Completed(_)) {
            *this.next_event_fut = None;
        } else {
            let next_event_fut =
                async move { next_event(partial_state).await };
            *this.next_event_fut = Some(Box::pin(next_event_fut));
        }

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            // Only `message_stop` may end the stream.
            Ok(None) => {
                return Err(Error::new(
                    "response stream ended before message_stop",
                    ErrorKind::Other,
                ));
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        let event = serde_json::from_str::<StreamEvent>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(event) = partial_state.apply(event)? {
            return Ok((event, partial_state));
        }
    }
}

impl PartialState {
    /// Folds a server event into the state, returning the model event it
    /// completes, if any.
    fn apply(
        &mut self,
        event: StreamEvent,
    ) -> Result<Option<ModelResponseEvent>, Error> {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let (block, initial_text) = match content_block {
                    BlockStart::Text { text } => (PartialBlock::Text, text),
                    BlockStart::ToolUse { id, name } => (
                        PartialBlock::ToolUse {
                            id,
                            name,
                            input_json: String::new(),
                        },
                        String::new(),
                    ),
                    BlockStart::Other => (PartialBlock::Other, String::new()),
                };
                if index >= self.blocks.len() {
                    self.blocks.resize_with(index + 1, || PartialBlock::Other);
                }
                self.blocks[index] = block;
                if !initial_text.is_empty() {
                    return Ok(Some(ModelResponseEvent::MessageDelta(
                        initial_text,
                    )));
                }
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } if !text.is_empty() => {
                    return Ok(Some(ModelResponseEvent::MessageDelta(text)));
                }
                BlockDelta::InputJsonDelta { partial_json } => {
                    let Some(PartialBlock::ToolUse { input_json, .. }) =
                        self.blocks.get_mut(index)
                    else {
                        return Err(Error::new(
                            format!("input delta for unknown block {index}"),
                            ErrorKind::Other,
                        ));
                    };
                    input_json.push_str(&partial_json);
                }
                _ => {}
            },
            StreamEvent::ContentBlockStop { index } => {
                let Some(block) = self.blocks.get_mut(index) else {
                    return Ok(None);
                };
                if let PartialBlock::ToolUse {
                    id,
                    name,
                    input_json,
                } = std::mem::replace(block, PartialBlock::Other)
                {
                    // A call without parameters streams no input at all.
                    let arguments = if input_json.trim().is_empty() {
                        json!({})
                    } else {
                        serde_json::from_str::<Value>(&input_json).map_err(
                            |err| {
                                Error::new(
                                    format!("invalid tool input: {err}"),
                                    ErrorKind::Other,
                                )
                            },
                        )?
                    };
                    return Ok(Some(ModelResponseEvent::ToolCall(
                        ToolCallRequest {
                            id,
                            name,
                            arguments,
                        },
                    )));
                }
            }
            StreamEvent::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
            }
            StreamEvent::MessageStop => {
                let reason = finish_reason(self.stop_reason.as_deref());
                return Ok(Some(ModelResponseEvent::Completed(reason)));
            }
            StreamEvent::Error { error } => {
                return Err(Error::new(error.message, error_kind(&error.kind)));
            }
            StreamEvent::Ignored => {}
        }
        Ok(None)
    }
}

fn finish_reason(stop_reason: Option<&str>) -> ModelFinishReason {
    match stop_reason {
        Some("tool_use") => ModelFinishReason::ToolCalls,
        Some("max_tokens") => ModelFinishReason::MaxTokens,
        _ => ModelFinishReason::Stop,
    }
}

/// Maps an API error type to an error kind.
pub(crate) fn error_kind(kind: &str) -> ErrorKind {
    match kind {
        "rate_limit_error" | "overloaded_error" => ErrorKind::RateLimitExceeded,
        "invalid_request_error" => ErrorKind::InvalidRequest,
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let mut resp = pin!(AnthropicResponse::from_sse(Sse::new(chunks)));
        let mut events = Vec::new();
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_use_response() {
        let events = collect(Chunks::canned(&[include_bytes!(
            "../fixtures/tool_use_response.txt"
        )]))
        .await
        .unwrap();

        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Let me ".to_owned()),
                ModelResponseEvent::MessageDelta("check.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "toolu_01".to_owned(),
                    name: "get_data_source".to_owned(),
                    arguments: json!({ "data_source_id": "42" }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "toolu_02".to_owned(),
                    name: "list_data_sources".to_owned(),
                    arguments: json!({}),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_end_turn_response() {
        let events = collect(Chunks::canned(&[include_bytes!(
            "../fixtures/end_turn_response.txt"
        )]))
        .await
        .unwrap();

        assert_eq!(
            events,
            [
                ModelResponseEvent::MessageDelta("Your app has ".to_owned()),
                ModelResponseEvent::MessageDelta("3 data sources.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_event() {
        let err = collect(Chunks::canned(&[
            b"event: ping\ndata: {\"type\":\"ping\"}\n\n",
            b"event: error\ndata: {\"type\":\"error\",\"error\":\
              {\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        ]))
        .await
        .unwrap_err();
        assert_eq!(err.message(), "Overloaded");
        assert_eq!(
            app_insight_model::ModelProviderError::kind(&err),
            ErrorKind::RateLimitExceeded
        );
    }

    #[tokio::test]
    async fn test_stream_cut_before_message_stop() {
        let fixture = include_str!("../fixtures/tool_use_response.txt");
        let cut = fixture
            .find("event: message_delta")
            .expect("fixture has a message_delta event");
        let err = collect(Chunks::canned(&[fixture[..cut].as_bytes()]))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "response stream ended before message_stop");
    }

    #[test]
    fn test_finish_reasons() {
        assert_eq!(finish_reason(Some("end_turn")), ModelFinishReason::Stop);
        assert_eq!(
            finish_reason(Some("max_tokens")),
            ModelFinishReason::MaxTokens
        );
        assert_eq!(finish_reason(None), ModelFinishReason::Stop);
    }
}
