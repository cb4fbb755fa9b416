//! Terminology server API client for ECL queries

use crate::error::{Error, Result};
use crate::models::{ConceptPage, ConceptsResponse, EclConcept};
use reqwest::Client;
use std::time::Duration;

/// Connection and retry settings for [`EclClient`]
#[derive(Debug, Clone)]
pub struct EclClientConfig {
    /// Base URL including the branch path, e.g. `https://snowstorm.example.org/MAIN`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Number of retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further retry
    pub retry_base_delay: Duration,
    /// Upper bound for the retry delay
    pub retry_max_delay: Duration,
    /// `limit` sent with every page request
    pub page_size: usize,
}

impl Default for EclClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/MAIN".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(5),
            page_size: 10_000,
        }
    }
}

/// Client for `GET {base}/concepts?ecl={expression}`.
#[derive(Debug, Clone)]
pub struct EclClient {
    client: Client,
    config: EclClientConfig,
}

impl EclClient {
    pub fn new(config: EclClientConfig) -> Result<Self> {
        if config.page_size == 0 {
            return Err(Error::Configuration(
                "page_size must be greater than zero".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Run an ECL expression and collect every matching concept across all pages.
    pub async fn query(&self, expression: &str) -> Result<Vec<EclConcept>> {
        let mut concepts = Vec::new();
        let mut search_after: Option<String> = None;

        loop {
            let page = self
                .fetch_page_with_retries(expression, search_after.as_deref())
                .await?;
            let received = page.items.len();
            concepts.extend(page.items);

            // The server may cap `limit` below the configured page size, so a
            // short page is not the end; only the total and the cursor are.
            if let Some(total) = page.total {
                if concepts.len() as u64 >= total {
                    break;
                }
            }

            match page.search_after {
                Some(next) if received > 0 && search_after.as_deref() != Some(next.as_str()) => {
                    search_after = Some(next);
                }
                _ => {
                    if let Some(total) = page.total {
                        return Err(Error::MalformedResponse(format!(
                            "paging ended after {} of {total} concepts",
                            concepts.len()
                        )));
                    }
                    break;
                }
            }
        }

        tracing::debug!(
            expression,
            concepts = concepts.len(),
            "ECL query completed"
        );

        Ok(concepts)
    }

    async fn fetch_page_with_retries(
        &self,
        expression: &str,
        search_after: Option<&str>,
    ) -> Result<ConceptPage> {
        let mut attempt = 0;
        let mut delay = self.config.retry_base_delay;

        loop {
            match self.fetch_page(expression, search_after).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_retries {
                        return Err(error);
                    }
                    attempt += 1;

                    tracing::warn!(
                        error = %error,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying ECL query"
                    );

                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.retry_max_delay);
                }
            }
        }
    }

    async fn fetch_page(&self, expression: &str, search_after: Option<&str>) -> Result<ConceptPage> {
        let mut url = format!(
            "{}/concepts?ecl={}&limit={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(expression),
            self.config.page_size
        );
        if let Some(cursor) = search_after {
            url.push_str("&searchAfter=");
            url.push_str(&urlencoding::encode(cursor));
        }

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed: ConceptsResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok(parsed.into_page())
    }
}
