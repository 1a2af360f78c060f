mod builder;
mod event;
mod turn;

use std::sync::Arc;

use app_insight_model::ModelProviderError;
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::Dispatcher;
pub use builder::{AgentBuilder, DEFAULT_MAX_ROUNDS};
pub use event::{TurnEvent, TurnEventStream};
use event::ProgressSink;

/// The reply returned when a turn runs out of rounds.
pub const TOOL_LIMIT_REPLY: &str = "Sorry, I hit the tool-call limit while \
    working on this question. Please try asking something more specific.";

/// The input of a turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInput {
    /// The new user message.
    pub message: String,
    /// The conversation so far, as returned by the previous turn.
    #[serde(default)]
    pub history: Conversation,
}

impl TurnInput {
    /// Creates an input that starts a new conversation.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            history: Conversation::new(),
        }
    }

    /// Continues the given conversation.
    #[inline]
    pub fn with_history(mut self, history: Conversation) -> Self {
        self.history = history;
        self
    }
}

/// The result of a completed turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutput {
    /// The final answer for the user.
    pub reply: String,
    /// The full conversation, including everything this turn appended.
    pub history: Conversation,
}

/// Errors that end a turn.
///
/// Failures of individual tools are not among them, those are handed back
/// to the model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The user message is missing or blank.
    #[error("message is required")]
    EmptyMessage,
    /// The model call failed.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
}

/// An agent answers questions about an app by letting the model call
/// backend tools.
///
/// The agent holds no conversation state. Every turn receives the history
/// from the caller and returns the extended history, so one agent can
/// serve any number of concurrent turns.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    model_client: ModelClient,
    dispatcher: Dispatcher,
    system_prompt: String,
    max_rounds: usize,
    history_window: usize,
}

impl Agent {
    /// Runs a turn to completion and returns the final result.
    pub async fn run_turn(
        &self,
        input: TurnInput,
    ) -> Result<TurnOutput, Error> {
        self.drive(input, &ProgressSink::discard()).await
    }

    /// Runs a turn in the background and streams its progress.
    ///
    /// The stream yields text fragments and tool starts as they happen,
    /// then exactly one terminal event. Dropping the stream stops the turn.
    ///
    /// Must be called within a Tokio runtime.
    pub fn stream_turn(&self, input: TurnInput) -> TurnEventStream {
        let (progress, rx) = ProgressSink::channel();
        let agent = self.clone();
        let task = tokio::spawn(async move {
            let terminal = match agent.drive(input, &progress).await {
                Ok(TurnOutput { reply, history }) => {
                    TurnEvent::Done { reply, history }
                }
                Err(err) => TurnEvent::Error {
                    message: err.to_string(),
                },
            };
            progress.emit(terminal);
        });
        TurnEventStream::new(rx, task)
    }

    /// Returns the system prompt sent with every request.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.inner.system_prompt
    }
}
