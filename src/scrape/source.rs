//! Page retrieval. Every scrape goes through a [`PageSource`], so the parsing and
//! reconciliation pipeline can be driven by something other than the live site.

use crate::scrape::error::FetchError;
use log::{debug, warn};
use reqwest::{Client, Url};
use std::future::Future;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("senamhi-rs/", env!("CARGO_PKG_VERSION"));

/// Something that can return the text body of a page.
pub trait PageSource {
    fn fetch_page(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// A [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Creates a source with a per-request timeout.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build configured HTTP client ({e}), using defaults");
                Client::new()
            });
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for HttpSource {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Builds a URL with query parameters, keeping parameter order.
pub(crate) fn build_url(base: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
    Url::parse_with_params(base, params).map_err(|e| FetchError::InvalidUrl {
        base: base.to_string(),
        reason: e.to_string(),
    })
}
