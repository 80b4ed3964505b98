// src/services/fetcher.rs

//! Paginated collection fetcher.
//!
//! Collection endpoints are paged. Every request carries a large page-size
//! hint to keep the number of calls down, and the fetcher keeps following
//! the `Link: rel="next"` header until the server stops sending one.

use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::logging::RunLog;
use crate::models::ApiConfig;
use crate::utils::http::{create_api_client, next_link};

/// Retrieves every record from a collection endpoint.
pub struct PageFetcher {
    client: Client,
    base_url: Url,
    per_page: u32,
    log: RunLog,
}

impl PageFetcher {
    /// Create a fetcher for the configured API.
    pub fn new(config: &ApiConfig, log: RunLog) -> Result<Self> {
        let client = create_api_client(config)?;
        Self::with_client(client, &config.base_url, config.per_page, log)
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client, base_url: &str, per_page: u32, log: RunLog) -> Result<Self> {
        // Endpoints are joined relative to the base, which needs a trailing slash.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            client,
            base_url,
            per_page,
            log,
        })
    }

    /// Full request URL for an endpoint and its query parameters.
    pub fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(endpoint.trim_start_matches('/'))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &self.per_page.to_string());
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Retrieve all records from a collection endpoint.
    ///
    /// A response holding a single object counts as a one-record page. Any
    /// failure is logged with the URL being requested and returned; no
    /// partial results are handed back.
    pub async fn fetch_all(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut next = Some(self.endpoint_url(endpoint, params)?.to_string());
        let mut records = Vec::new();

        while let Some(url) = next {
            match self.fetch_page(&url).await {
                Ok((page, link)) => {
                    records.extend(page);
                    next = link;
                }
                Err(e) => {
                    self.log
                        .error(&format!("Error making API request at: {url}"));
                    self.log.error(&format!("Error object: {e}"));
                    return Err(e);
                }
            }
        }

        Ok(records)
    }

    /// Fetch one page, returning its records and the next page link.
    async fn fetch_page(&self, url: &str) -> Result<(Vec<Value>, Option<String>)> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let link = next_link(response.headers());

        let page = match response.json::<Value>().await? {
            Value::Array(items) => items,
            Value::Null => return Err(AppError::api(url, "empty response body")),
            single => vec![single],
        };

        log::debug!("Fetched {} record(s) from {}", page.len(), url);
        Ok((page, link))
    }
}
