//! Tracked reqwest client.

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::tracker::call::CallTracker;
use crate::tracker::types::TrackerError;

/// Per-request options for [`TrackedClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl FetchOptions {
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

/// A reqwest client whose every request goes through a [`CallTracker`].
#[derive(Clone)]
pub struct TrackedClient {
    client: Client,
    tracker: CallTracker,
}

impl TrackedClient {
    /// Build the underlying client from configuration.
    ///
    /// Failure here means no HTTP client is available and is reported to the
    /// caller rather than swallowed.
    pub fn new(config: &ClientConfig, tracker: CallTracker) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::from_client(client, tracker))
    }

    pub fn from_client(client: Client, tracker: CallTracker) -> Self {
        Self { client, tracker }
    }

    pub fn tracker(&self) -> &CallTracker {
        &self.tracker
    }

    /// Send a request and record it against the current transaction.
    ///
    /// Returns exactly what reqwest returns.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> reqwest::Result<Response> {
        let method = options.method.clone();
        let mut request = self.client.request(options.method, url).headers(options.headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }

        self.tracker
            .track(url, method.as_str(), || request.send())
            .await
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        self.fetch(url, FetchOptions::default()).await
    }
}
