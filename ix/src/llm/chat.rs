//! OpenAI-compatible chat completions client
//!
//! Sends the whole prompt as a single user message and returns the first
//! choice's text. Works against xAI, OpenAI and anything else that speaks
//! `/v1/chat/completions`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LlmChannel, LlmError};
use crate::config::LlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest server-requested wait we will sit through
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Delay before the next attempt
///
/// A rate limit that named its own wait is honoured (capped), everything else
/// backs off exponentially.
fn retry_delay(error: &LlmError, attempt: u32) -> Duration {
    let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
    match error.retry_after() {
        Some(wait) => wait.min(MAX_RETRY_AFTER),
        None => backoff,
    }
}

/// Chat completions client
pub struct ChatClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatClient {
    /// Create a new client from configuration, reading the API key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(provider = %config.provider, model = %config.model, "ChatClient::from_config: called");
        let api_key = config
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    /// Create a client with an explicit API key
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        debug!(%self.model, prompt_len = prompt.len(), "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
        })
    }

    /// Extract the reply text from the API response
    fn parse_response(api_response: ChatResponse) -> Result<String, LlmError> {
        debug!(choices = api_response.choices.len(), "parse_response: called");
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no message content".to_string()))
    }

    /// One request, with the failure classified for the retry loop
    async fn send_once(&self, url: &str, body: &serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    debug!("send_once: request timed out");
                    LlmError::Timeout(self.timeout)
                } else {
                    debug!(error = %e, "send_once: network error");
                    LlmError::Network(e)
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            debug!(?retry_after, "send_once: rate limited (429)");
            return Err(LlmError::RateLimited {
                retry_after: retry_after.map(Duration::from_secs),
            });
        }

        if !response.status().is_success() {
            debug!(%status, "send_once: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("send_once: success");
        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Malformed response body: {}", e)))?;
        Self::parse_response(api_response)
    }
}

#[async_trait]
impl LlmChannel for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(%self.model, "complete: called");
        let url = self.endpoint();
        let body = self.build_request_body(prompt);

        for attempt in 0..=MAX_RETRIES {
            let error = match self.send_once(&url, &body).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt == MAX_RETRIES {
                return Err(error);
            }

            let delay = retry_delay(&error, attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "complete: retrying after transient error");
            tokio::time::sleep(delay).await;
        }

        Err(LlmError::InvalidResponse("Max retries exceeded".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
