//! Reqwest-backed [`Upstream`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::gateway::Upstream;

/// HTTP client for one upstream base endpoint.
///
/// The optional credential is sent as an `api_key` query parameter on every
/// request. A per-request timeout can be supplied by the caller; there is
/// no default and no retry here.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpUpstream {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn query_pairs(&self, params: &Value) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(api_key) = &self.api_key {
            pairs.push(("api_key".to_string(), api_key.clone()));
        }
        if let Some(object) = params.as_object() {
            for (name, value) in object {
                pairs.push((name.clone(), query_value(value)));
            }
        }
        pairs
    }
}

/// Render one JSON param as a query string value (strings unquoted).
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn retry_after_hint(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, path: &str, params: &Value) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&self.query_pairs(params));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_hint(&response);
            let message = response.text().await.unwrap_or_default();
            tracing::error!("upstream error: {} - {}", status, message);
            return Err(UpstreamError::from_status(status.as_u16(), message, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))
    }
}
