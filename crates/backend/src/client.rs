use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde_json::Value;
use tracing::Instrument;
use urlencoding::encode;

use crate::rows::cap_rows;
use crate::{BackendConfig, Error};

/// How much of an error response body is kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 200;

/// A read-only client for the application platform.
///
/// The client is cheap to clone and holds no state beyond its
/// configuration, so one instance can serve any number of concurrent
/// turns.
#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    config: Arc<BackendConfig>,
}

impl BackendClient {
    /// Creates a new `BackendClient` with the given configuration.
    #[inline]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Issues an authenticated GET for `path`, relative to the base URL.
    ///
    /// Rate-limited responses and network failures are retried with
    /// exponential backoff until the attempt budget runs out, at which
    /// point [`Error::RetriesExhausted`] carries the last failure. Every
    /// other non-success status fails right away.
    pub async fn request(&self, path: &str) -> Result<Value, Error> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|_| Error::InvalidPath(path.to_owned()))?;
        let max_attempts = self.config.max_attempts;

        let mut attempt = 0;
        let operation = || {
            attempt += 1;
            let attempt = attempt;
            let req = self
                .client
                .get(url.clone())
                .bearer_auth(&self.config.token)
                .header(header::ACCEPT, "application/json");
            async move {
                trace!("attempt {attempt}/{max_attempts}");
                match send_once(req).await {
                    Ok(value) => Ok(value),
                    Err(err) if !err.is_transient() => {
                        Err(backoff::Error::permanent(err))
                    }
                    Err(err) if attempt >= max_attempts => {
                        Err(backoff::Error::permanent(Error::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        }))
                    }
                    Err(err) => Err(backoff::Error::transient(err)),
                }
            }
        };
        let notify = |err: Error, delay: Duration| {
            warn!("backend request failed ({err}), retrying in {delay:?}");
        };

        retry_notify(self.retry_policy(), operation, notify)
            .instrument(debug_span!("backend request", path))
            .await
    }

    fn retry_policy(&self) -> backoff::ExponentialBackoff {
        // Without jitter, retry `n` (0-based) waits `base * 2^n`.
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_base_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Fetches the metadata of an app.
    pub async fn app(&self, app_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/apps/{}", encode(app_id))).await
    }

    /// Lists the data sources of an app.
    pub async fn data_sources(&self, app_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/data-sources?appId={}", encode(app_id)))
            .await
    }

    /// Fetches a single data source.
    pub async fn data_source(&self, data_source_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/data-sources/{}", encode(data_source_id)))
            .await
    }

    /// Lists the rows of a data source, capped to the configured row limit.
    pub async fn data_source_entries(
        &self,
        data_source_id: &str,
    ) -> Result<Value, Error> {
        let payload = self
            .request(&format!("v1/data-sources/{}/data", encode(data_source_id)))
            .await?;
        Ok(cap_rows(
            payload,
            &self.config.rows_field,
            self.config.row_cap,
        ))
    }

    /// Lists the media folders of an app.
    pub async fn media_folders(&self, app_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/media?appId={}", encode(app_id))).await
    }

    /// Lists the files in a media folder.
    pub async fn folder_files(&self, folder_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/media?folderId={}", encode(folder_id)))
            .await
    }

    /// Fetches the metadata of a single file.
    pub async fn file(&self, file_id: &str) -> Result<Value, Error> {
        self.request(&format!("v1/media/files/{}", encode(file_id)))
            .await
    }
}

async fn send_once(req: RequestBuilder) -> Result<Value, Error> {
    let resp = req.send().await.map_err(Error::Network)?;
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited);
    }

    let body = resp.text().await.map_err(Error::Network)?;
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }
    serde_json::from_str(&body).map_err(Error::Decode)
}
