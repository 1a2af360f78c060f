//! The tool catalog the model is offered, and dispatch of the calls it
//! makes back to the backend.

mod catalog;
mod dispatcher;
mod error;

pub use catalog::{ToolCatalog, ToolKind};
pub use dispatcher::Dispatcher;
pub use error::{Error, ErrorKind};

/// The result of a tool call.
pub type ToolResult = Result<serde_json::Value, Error>;
