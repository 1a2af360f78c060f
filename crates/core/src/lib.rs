//! Core logic including the agent loop, the tool catalog, and tool
//! dispatch.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, DEFAULT_MAX_ROUNDS, Error, TOOL_LIMIT_REPLY, TurnEvent,
    TurnEventStream, TurnInput, TurnOutput,
};
pub use conversation::Conversation;
