//! OpenAI and OpenAI-compatible chat completion client.
//!
//! Also serves local endpoints like Ollama or vLLM through the
//! openai-compatible provider, where the API key may be empty.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::provider::retry::{DEFAULT_MAX_RETRIES, RawResponse, send_with_retry};
use crate::provider::{CompletionRequest, CompletionResponse, ModelClient};

#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, max_tokens: u32, base_url: String) -> Self {
        Self { http: reqwest::Client::new(), api_key, model, max_tokens, base_url }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "is_zero")]
    max_tokens: u32,
    temperature: f64,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: ChoiceMessage,
}

#[derive(Deserialize, Default)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        let max_tokens = if req.max_tokens == 0 { self.max_tokens } else { req.max_tokens };

        let mut messages = Vec::new();
        if !req.system_prompt.is_empty() {
            messages.push(ChatMessage { role: "system", content: &req.system_prompt });
        }
        messages.push(ChatMessage { role: "user", content: &req.user_prompt });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: req.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);

        let start = Instant::now();
        let raw = send_with_retry(
            || async {
                let mut request = self.http.post(&url).json(&body);
                if !self.api_key.is_empty() {
                    request = request.bearer_auth(&self.api_key);
                }
                let resp = request
                    .send()
                    .await
                    .map_err(|e| EvalError::Provider(format!("API call failed: {}", e)))?;
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
            "API error (status {}): {}",
            raw.status, raw.body
        )));
    }

    let result: ChatResponse = serde_json::from_str(&raw.body)
        .map_err(|e| EvalError::Provider(format!("decode response: {}", e)))?;

    if let Some(err) = result.error {
        return Err(EvalError::Provider(format!("API error: {}", err.message)));
    }

    match result.choices.into_iter().next() {
        Some(choice) => Ok((choice.message.content, result.model)),
        None => Err(EvalError::Provider("empty response from API".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse { status, retry_after: None, body: body.into() }
    }

    #[test]
    fn system_message_precedes_user_message() {
        let body = ChatRequest {
            model: "test-model",
            messages: vec![
                ChatMessage { role: "system", content: "be brief" },
                ChatMessage { role: "user", content: "hi" },
            ],
            max_tokens: 100,
            temperature: 0.7,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_tokens"], 100);
        assert_eq!(value["temperature"], 0.7);
    }

    #[test]
    fn zero_max_tokens_is_omitted() {
        let body = ChatRequest {
            model: "test-model",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_tokens: 0,
            temperature: 0.0,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["temperature"], 0.0);
    }

    #[test]
    fn decode_happy_path() {
        let (text, model) = decode_response(&raw(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"hello from test"}}],"model":"test-model"}"#,
        ))
        .unwrap();
        assert_eq!(text, "hello from test");
        assert_eq!(model, "test-model");
    }

    #[test]
    fn decode_surfaces_http_errors() {
        let err = decode_response(&raw(429, r#"{"error": {"message": "rate limited"}}"#))
            .unwrap_err();
        assert!(err.to_string().contains("API error (status 429)"));
    }

    #[test]
    fn decode_surfaces_api_errors() {
        let err = decode_response(&raw(200, r#"{"error":{"message":"bad model"}}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "API error: bad model");
    }

    #[test]
    fn decode_rejects_empty_choices() {
        let err = decode_response(&raw(200, r#"{"model":"test"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "empty response from API");
    }
}
