//! A read-only client for the application platform's REST API.
//!
//! The client shields callers from transient failures (rate limiting and
//! network faults are retried with exponential backoff) and from oversized
//! row listings, which are capped before they ever reach the model.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod config;
mod error;
mod rows;

pub use client::BackendClient;
pub use config::{BackendConfig, BackendConfigBuilder};
pub use error::Error;
pub use rows::{ROW_CAP, cap_rows};
