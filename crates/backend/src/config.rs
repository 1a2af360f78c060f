use std::fmt::{self, Debug};
use std::time::Duration;

use reqwest::Url;

use crate::Error;
use crate::rows::{ROW_CAP, ROWS_FIELD};

const DEFAULT_BASE_URL: &str = "https://api.fliplet.com/";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Builder for [`BackendConfig`].
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfigBuilder {
    token: String,
    base_url: Option<String>,
    retry_base_delay: Option<Duration>,
    max_attempts: Option<u32>,
    row_cap: Option<usize>,
    rows_field: Option<String>,
}

impl BackendConfigBuilder {
    /// Creates a builder with the given API token.
    #[inline]
    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
            base_url: None,
            retry_base_delay: None,
            max_attempts: None,
            row_cap: None,
            rows_field: None,
        }
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the delay before the first retry. Each further retry doubles it.
    #[inline]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = Some(delay);
        self
    }

    /// Sets how many attempts a request gets, the first one included.
    #[inline]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets the maximum number of rows a listing may return.
    #[inline]
    pub fn with_row_cap(mut self, row_cap: usize) -> Self {
        self.row_cap = Some(row_cap);
        self
    }

    /// Sets the field that holds the rows of a data source listing.
    #[inline]
    pub fn with_rows_field<S: Into<String>>(mut self, field: S) -> Self {
        self.rows_field = Some(field.into());
        self
    }

    /// Builds the configuration.
    ///
    /// Fails if the token is blank or the base URL is not a valid URL.
    pub fn build(self) -> Result<BackendConfig, Error> {
        if self.token.trim().is_empty() {
            return Err(Error::Config("API token is missing".to_owned()));
        }

        let mut base_url =
            self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        // `Url::join` replaces the last segment unless the base ends with `/`.
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid base URL: {err}")))?;

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(Error::Config("max attempts must be positive".to_owned()));
        }

        Ok(BackendConfig {
            token: self.token,
            base_url,
            retry_base_delay: self
                .retry_base_delay
                .unwrap_or(DEFAULT_RETRY_BASE_DELAY),
            max_attempts,
            row_cap: self.row_cap.unwrap_or(ROW_CAP),
            rows_field: self.rows_field.unwrap_or_else(|| ROWS_FIELD.to_owned()),
        })
    }
}

impl Debug for BackendConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfigBuilder")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("max_attempts", &self.max_attempts)
            .field("row_cap", &self.row_cap)
            .field("rows_field", &self.rows_field)
            .finish()
    }
}

/// Configuration for [`BackendClient`](crate::BackendClient).
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub(crate) token: String,
    pub(crate) base_url: Url,
    pub(crate) retry_base_delay: Duration,
    pub(crate) max_attempts: u32,
    pub(crate) row_cap: usize,
    pub(crate) rows_field: String,
}

impl Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("retry_base_delay", &self.retry_base_delay)
            .field("max_attempts", &self.max_attempts)
            .field("row_cap", &self.row_cap)
            .field("rows_field", &self.rows_field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_rejected() {
        let err = BackendConfigBuilder::with_token("  ").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_defaults_and_redaction() {
        let config = BackendConfigBuilder::with_token("secret")
            .with_base_url("http://localhost:8080/api")
            .build()
            .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/api/");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.row_cap, 50);
        assert_eq!(config.rows_field, "entries");

        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }
}
