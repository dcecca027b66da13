//! Outbound model calls.
//!
//! One best-effort POST per request, either straight to the provider or
//! through a user-configured proxy that holds the credentials. Missing
//! configuration is reported before any network traffic happens.

use crate::settings::{Mode, Settings};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!("mailbrief/", env!("CARGO_PKG_VERSION"));

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reported when proxy mode is selected without a proxy URL
pub const ERR_PROXY_URL: &str = "proxyUrl required";

/// Reported when direct mode is selected without credentials
pub const ERR_DIRECT_CONFIG: &str = "apiKey or apiEndpoint not set. Use popup to set them.";

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing configuration, raised before any network attempt
    #[error("{0}")]
    Config(&'static str),
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP gateway to the summarization endpoint.
pub struct Gateway {
    client: Client,
}

impl Gateway {
    pub fn new() -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Issue the model call and return the parsed response body.
    ///
    /// The response is always parsed as JSON; a body that is not JSON is an
    /// error, not a panic. No retries.
    pub async fn call(
        &self,
        prompt: &str,
        mode: Mode,
        settings: &Settings,
    ) -> Result<Value, GatewayError> {
        match mode {
            Mode::Proxy => self.call_proxy(prompt, settings).await,
            Mode::Direct => self.call_direct(prompt, settings).await,
        }
    }

    async fn call_proxy(&self, prompt: &str, settings: &Settings) -> Result<Value, GatewayError> {
        let proxy_url = settings
            .proxy_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(GatewayError::Config(ERR_PROXY_URL))?;

        let response = self
            .client
            .post(proxy_url)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }

    async fn call_direct(&self, prompt: &str, settings: &Settings) -> Result<Value, GatewayError> {
        let api_key = settings.api_key.as_deref().filter(|key| !key.is_empty());
        let api_endpoint = settings
            .api_endpoint
            .as_deref()
            .filter(|url| !url.is_empty());
        let (api_key, api_endpoint) = match (api_key, api_endpoint) {
            (Some(key), Some(endpoint)) => (key, endpoint),
            _ => return Err(GatewayError::Config(ERR_DIRECT_CONFIG)),
        };

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(api_endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }
}
