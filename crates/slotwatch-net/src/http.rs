//! HTTP client for the appointment sessions API.

use std::time::Duration;

use async_trait::async_trait;
use slotwatch_core::{FetchError, SlotQuery, SlotSource};
use thiserror::Error;
use tracing::{info, warn};

use crate::backoff::Backoff;

/// The sessions API rejects requests without a browser-like agent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:87.0) Gecko/20100101 Firefox/87.0";

const MAX_ERROR_BODY: usize = 200;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Polls `calendarByDistrict` / `findByPin` with bounded retries.
pub struct SlotClient {
    client: reqwest::Client,
    api_root: String,
    backoff: Backoff,
}

impl SlotClient {
    /// `api_root` is the sessions root, e.g.
    /// `https://cdn-api.co-vin.in/api/v2/appointment/sessions` (no trailing slash needed).
    pub fn new(api_root: String, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            backoff: Backoff::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        resp.text().await.map_err(classify)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(Box::new(err))
    }
}

#[async_trait]
impl SlotSource for SlotClient {
    async fn fetch(&self, query: &SlotQuery) -> Result<String, FetchError> {
        let url = query.url(&self.api_root);
        let mut attempt = 0;
        loop {
            match self.fetch_once(&url).await {
                Ok(body) => {
                    info!(url = %url, bytes = body.len(), "fetched sessions");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.backoff.max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = self.backoff.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
