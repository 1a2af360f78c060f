use std::env;
use std::fmt::{self, Debug};

use crate::Error;

const API_TOKEN: &str = "APP_INSIGHT_API_TOKEN";
const APP_ID: &str = "APP_INSIGHT_APP_ID";
const BASE_URL: &str = "APP_INSIGHT_BASE_URL";
const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";

/// Process settings, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub(crate) api_token: String,
    pub(crate) app_id: String,
    pub(crate) base_url: Option<String>,
    pub(crate) anthropic_api_key: String,
    pub(crate) anthropic_model: Option<String>,
    pub(crate) anthropic_base_url: Option<String>,
}

impl Settings {
    /// Reads the settings from environment variables.
    ///
    /// | Variable                | Required |
    /// |-------------------------|----------|
    /// | `APP_INSIGHT_API_TOKEN` | yes      |
    /// | `APP_INSIGHT_APP_ID`    | yes      |
    /// | `APP_INSIGHT_BASE_URL`  | no       |
    /// | `ANTHROPIC_API_KEY`     | yes      |
    /// | `ANTHROPIC_MODEL`       | no       |
    /// | `ANTHROPIC_BASE_URL`    | no       |
    #[inline]
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required =
            |name: &'static str| optional(name).ok_or(Error::MissingVar(name));

        Ok(Self {
            api_token: required(API_TOKEN)?,
            app_id: required(APP_ID)?,
            base_url: optional(BASE_URL),
            anthropic_api_key: required(ANTHROPIC_API_KEY)?,
            anthropic_model: optional(ANTHROPIC_MODEL),
            anthropic_base_url: optional(ANTHROPIC_BASE_URL),
        })
    }

    /// Returns the app that questions are about by default.
    #[inline]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("base_url", &self.base_url)
            .field("anthropic_api_key", &"<redacted>")
            .field("anthropic_model", &self.anthropic_model)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .finish()
    }
}
