//! HTTP source for the JSON resource
//!
//! This module handles the single network call behind every fetch attempt:
//! - Building the HTTP client with a user agent and timeouts
//! - One GET per attempt with a status check
//! - Parsing the body as JSON and classifying failures

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Parsed JSON document returned by a successful attempt
pub type Payload = serde_json::Value;

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed JSON from {url}: {source}")]
    Malformed {
        url: String,
        source: serde_json::Error,
    },
}

impl AttemptError {
    /// Transport and status failures are worth another attempt; a 2xx body
    /// that does not parse is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Malformed { .. })
    }
}

/// Something that can produce the JSON payload once per call
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Human readable location of the resource, used in logs
    fn location(&self) -> &str;

    /// Performs exactly one attempt
    async fn fetch(&self) -> Result<Payload, AttemptError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain GET against a fixed URL
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Builds the client from the fetch configuration and targets its URL
    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, &config.target_url))
    }
}

#[async_trait]
impl JsonSource for HttpSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Payload, AttemptError> {
        let transport = |source| AttemptError::Transport {
            url: self.url.clone(),
            source,
        };

        let response = self.client.get(&self.url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;

        serde_json::from_slice(&body).map_err(|source| AttemptError::Malformed {
            url: self.url.clone(),
            source,
        })
    }
}
