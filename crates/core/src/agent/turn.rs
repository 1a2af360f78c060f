use app_insight_model::{Message, ModelRequest, Role};
use tracing::Instrument;

use super::event::{ProgressSink, TurnEvent};
use super::{Agent, Error, TOOL_LIMIT_REPLY, TurnInput, TurnOutput};
use crate::model_client::StreamEvent;

impl Agent {
    /// Drives one turn through its rounds, reporting progress to `progress`.
    ///
    /// All state of the turn lives in this call, nothing is shared with
    /// other turns.
    pub(super) async fn drive(
        &self,
        input: TurnInput,
        progress: &ProgressSink,
    ) -> Result<TurnOutput, Error> {
        let TurnInput { message, history } = input;
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let inner = &*self.inner;
        let mut history = history;
        history.push(Message::user(message));
        // The window is fixed once per turn. Messages appended by later
        // rounds extend it, older ones are never submitted.
        let window_start = history.window_start(inner.history_window);
        let tools = inner.dispatcher.definitions();

        for round in 0..inner.max_rounds {
            let req = ModelRequest {
                system: Some(inner.system_prompt.clone()),
                messages: history.messages()[window_start..].to_vec(),
                tools: tools.clone(),
            };

            let on_event = {
                let progress = progress.clone();
                move |event: StreamEvent| {
                    progress.emit(match event {
                        StreamEvent::MessageDelta(text) => {
                            TurnEvent::TextDelta { text }
                        }
                        StreamEvent::ToolCall(req) => TurnEvent::ToolStart {
                            name: req.name,
                            input: req.arguments,
                        },
                    })
                }
            };
            let resp = inner
                .model_client
                .send_request(req, on_event)
                .instrument(debug_span!("model round", round))
                .await
                .map_err(Error::Model)?;

            let wants_tools = resp.wants_tools();
            let reply = resp.message.text();
            history.push(resp.message);

            if !wants_tools {
                debug!(
                    "turn finished after {} rounds ({:?})",
                    round + 1,
                    resp.finish_reason
                );
                return Ok(TurnOutput { reply, history });
            }

            trace!("running {} tools", resp.tool_calls.len());
            let results =
                inner.dispatcher.handle_requests(resp.tool_calls).await;
            history.push(Message::with_blocks(Role::User, results));
        }

        warn!("turn stopped after {} rounds", inner.max_rounds);
        Ok(TurnOutput {
            reply: TOOL_LIMIT_REPLY.to_owned(),
            history,
        })
    }
}
