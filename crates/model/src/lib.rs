//! An abstraction layer for different LLMs.
//!
//! This crate establishes an unified protocol for the agent to interact
//! with the model that drives it, so that the agent loop never depends on
//! a concrete inference service.
//!
//! The conversation types here double as the wire format callers keep
//! between turns. They serialize to the same shape the Anthropic Messages
//! API accepts, so a history can be persisted or shipped over a transport
//! without any conversion.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
