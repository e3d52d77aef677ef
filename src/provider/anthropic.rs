//! Anthropic Messages API client.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::provider::retry::{DEFAULT_MAX_RETRIES, RawResponse, send_with_retry};
use crate::provider::{CompletionRequest, CompletionResponse, ModelClient};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        Self { http: reqwest::Client::new(), api_key, model, max_tokens }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        let max_tokens = if req.max_tokens == 0 { self.max_tokens } else { req.max_tokens };

        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            system: (!req.system_prompt.is_empty()).then_some(req.system_prompt.as_str()),
            messages: vec![Message { role: "user", content: &req.user_prompt }],
            temperature: req.temperature,
        };

        let url = format!("{}/messages", DEFAULT_BASE_URL);

        let start = Instant::now();
        let raw = send_with_retry(
            || async {
                let resp = self
                    .http
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| {
                        EvalError::Provider(format!("anthropic API call failed: {}", e))
                    })?;
                let status = resp.status().as_u16();
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let body = resp
                    .text()
                    .await
                    .map_err(|e| EvalError::Provider(format!("read response: {}", e)))?;
                Ok(RawResponse { status, retry_after, body })
            },
            DEFAULT_MAX_RETRIES,
        )
        .await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (text, model) = decode_response(&raw)?;
        Ok(CompletionResponse { text, model, latency_ms })
    }
}

fn decode_response(raw: &RawResponse) -> Result<(String, String)> {
    if raw.status != 200 {
        return Err(EvalError::Provider(format!(
            "anthropic API error (status {}): {}",
            raw.status, raw.body
        )));
    }

    let result: MessagesResponse = serde_json::from_str(&raw.body)
        .map_err(|e| EvalError::Provider(format!("decode response: {}", e)))?;

    if let Some(err) = result.error {
        return Err(EvalError::Provider(format!("anthropic error: {}", err.message)));
    }

    match result.content.into_iter().next() {
        Some(block) => Ok((block.text, result.model)),
        None => Err(EvalError::Provider("empty response from anthropic".to_string())),
    }
}
