//! Hashtag search endpoint client.

use crate::{FetchConfig, SearchCredentials, SearchPage};
use reqwest::Client;
use std::time::Duration;
use tagrelay_error::{FetchError, FetchErrorKind, FetchResult};
use tagrelay_retry::{RetryPolicy, retry_with_backoff};
use tracing::{debug, error, instrument};

/// Client for the third-party hashtag search API.
#[derive(Debug, Clone)]
pub struct HashtagClient {
    http: Client,
    endpoint: String,
    credentials: SearchCredentials,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HashtagClient {
    /// Create a client from configuration and credentials.
    ///
    /// The endpoint is `search_base_url` (or `https://{api_host}` when unset)
    /// joined with `search_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &FetchConfig, credentials: SearchCredentials) -> FetchResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                FetchError::new(FetchErrorKind::Network(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;
        Ok(Self::with_http(http, config, credentials))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_http(http: Client, config: &FetchConfig, credentials: SearchCredentials) -> Self {
        let base = config
            .search_base_url()
            .clone()
            .unwrap_or_else(|| format!("https://{}", credentials.api_host()));
        let endpoint = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            config.search_path().trim_start_matches('/')
        );
        debug!(endpoint = %endpoint, "Creating hashtag search client");
        Self {
            http,
            endpoint,
            credentials,
            timeout: config.search_timeout(),
            retry: config.search_retry().clone(),
        }
    }

    /// Full URL of the search endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one page of results for `tag`, retrying transient failures.
    ///
    /// Pass the previous page's continuation token to get the next page.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn search(&self, tag: &str, continuation: Option<&str>) -> FetchResult<SearchPage> {
        retry_with_backoff(&self.retry, "hashtag search", |attempt| {
            self.search_once(tag, continuation, attempt)
        })
        .await
    }

    async fn search_once(
        &self,
        tag: &str,
        continuation: Option<&str>,
        attempt: u32,
    ) -> FetchResult<SearchPage> {
        debug!(tag, attempt, has_token = continuation.is_some(), "Sending hashtag search");

        let mut request = self
            .http
            .get(&self.endpoint)
            .header("x-rapidapi-host", self.credentials.api_host())
            .header("x-rapidapi-key", self.credentials.api_key())
            .query(&[("hashtag", tag)])
            .timeout(self.timeout);
        if let Some(token) = continuation {
            request = request.query(&[("continuation_token", token)]);
        }

        let response = request.send().await.map_err(|e| {
            error!(tag, error = %e, "Hashtag search request failed");
            FetchError::new(FetchErrorKind::Network(e.to_string()))
        })?;

        let status = response.status();
        debug!(tag, status = status.as_u16(), "Hashtag search responded");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::new(FetchErrorKind::Upstream {
                status: status.as_u16(),
                message: body,
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Network(e.to_string())))?;
        let page = SearchPage::from_json(&body)
            .map_err(|e| FetchError::new(FetchErrorKind::Parse(e.to_string())))?;

        debug!(
            tag,
            items = page.items.len(),
            has_next = page.continuation_token.is_some(),
            "Decoded search page"
        );
        Ok(page)
    }
}
