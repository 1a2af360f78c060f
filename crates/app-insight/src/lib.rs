//! An out-of-the-box agent that answers questions about an app, backed by
//! Claude and the platform's REST API.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library, for example to serve turns over HTTP. The agent keeps
//! no conversation state, so callers pass the history in on every turn and
//! store whatever comes back.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod settings;

use app_insight_anthropic_model::{AnthropicConfigBuilder, AnthropicProvider};
use app_insight_backend::{BackendClient, BackendConfigBuilder};
use app_insight_core::tool::{Dispatcher, ToolCatalog};
use app_insight_core::{Agent, AgentBuilder};

pub use settings::Settings;

/// Re-exports of [`app_insight_core`] crate.
pub mod core {
    pub use app_insight_core::*;
}

/// Re-exports of [`app_insight_model`] crate.
pub mod model {
    pub use app_insight_model::*;
}

/// Errors raised while setting up the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required environment variable is missing or blank.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    /// The backend settings are unusable.
    #[error("invalid backend settings: {0}")]
    Backend(#[from] app_insight_backend::Error),
}

/// Assembles an agent from the given settings.
pub fn build_agent(settings: &Settings) -> Result<Agent, Error> {
    let mut backend_config =
        BackendConfigBuilder::with_token(settings.api_token.as_str());
    if let Some(base_url) = &settings.base_url {
        backend_config = backend_config.with_base_url(base_url.as_str());
    }
    let backend = BackendClient::new(backend_config.build()?);

    let mut model_config = AnthropicConfigBuilder::with_api_key(
        settings.anthropic_api_key.as_str(),
    );
    if let Some(model) = &settings.anthropic_model {
        model_config = model_config.with_model(model.as_str());
    }
    if let Some(base_url) = &settings.anthropic_base_url {
        model_config = model_config.with_base_url(base_url.as_str());
    }
    let provider = AnthropicProvider::new(model_config.build());

    let dispatcher =
        Dispatcher::new(ToolCatalog::new(settings.app_id.as_str()), backend);
    debug!("assembled an agent for app {}", settings.app_id);
    Ok(AgentBuilder::with_model_provider(provider, dispatcher).build())
}
