use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::conversation::Conversation;

/// A progress notification of a streaming turn.
///
/// A stream carries any number of `TextDelta` and `ToolStart` events in
/// the order they happened, followed by exactly one `Done` or `Error`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A fragment of assistant text.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// The model asked for a tool. Sent before the tool runs.
    ToolStart {
        /// Name of the tool.
        name: String,
        /// Input of the call.
        input: Value,
    },
    /// The turn has completed.
    Done {
        /// The final answer.
        reply: String,
        /// The full conversation after this turn.
        history: Conversation,
    },
    /// The turn has failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl TurnEvent {
    /// Returns `true` if no events follow this one.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Done { .. } | TurnEvent::Error { .. })
    }
}

/// Where a turn reports its progress. Blocking turns discard everything.
#[derive(Clone)]
pub(crate) struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<TurnEvent>>,
}

impl ProgressSink {
    #[inline]
    pub(crate) fn discard() -> Self {
        Self { tx: None }
    }

    #[inline]
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    #[inline]
    pub(crate) fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.tx {
            // The consumer may be gone already, the turn carries on.
            tx.send(event).ok();
        }
    }
}

/// The events of a turn started by [`Agent::stream_turn`].
///
/// Dropping the stream aborts the turn.
///
/// [`Agent::stream_turn`]: crate::Agent::stream_turn
pub struct TurnEventStream {
    rx: mpsc::UnboundedReceiver<TurnEvent>,
    task: JoinHandle<()>,
}

impl TurnEventStream {
    #[inline]
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<TurnEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { rx, task }
    }

    /// Receives the next event, or `None` after the terminal one.
    #[inline]
    pub async fn next(&mut self) -> Option<TurnEvent> {
        self.rx.recv().await
    }
}

impl Stream for TurnEventStream {
    type Item = TurnEvent;

    #[inline]
    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TurnEventStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
