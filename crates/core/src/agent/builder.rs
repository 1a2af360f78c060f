use std::sync::Arc;

use app_insight_model::ModelProvider;

use super::{Agent, AgentInner};
use crate::conversation::HISTORY_WINDOW;
use crate::model_client::ModelClient;
use crate::tool::Dispatcher;

/// The default number of rounds a turn may take.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

const DEFAULT_SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    dispatcher: Dispatcher,
    system_prompt: Option<String>,
    max_rounds: usize,
    history_window: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider and tool
    /// dispatcher.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            dispatcher,
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            history_window: HISTORY_WINDOW,
        }
    }

    /// Replaces the default system prompt.
    ///
    /// `{{APP_ID}}` in the prompt is replaced with the default app.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets how many model rounds a turn may take.
    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Sets how many recent messages are submitted to the model.
    #[inline]
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window.max(1);
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let Self {
            model_client,
            dispatcher,
            system_prompt,
            max_rounds,
            history_window,
        } = self;

        let system_prompt = system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .replace("{{APP_ID}}", dispatcher.catalog().default_app_id());

        Agent {
            inner: Arc::new(AgentInner {
                model_client,
                dispatcher,
                system_prompt,
                max_rounds,
                history_window,
            }),
        }
    }
}
