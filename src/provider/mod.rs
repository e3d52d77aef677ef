//! Model provider clients.
//!
//! Abstracts LLM completions behind `ModelClient` so the probe runner can
//! drive any provider:
//! - `AnthropicClient`: Anthropic Messages API
//! - `OpenAiClient`: OpenAI and OpenAI-compatible chat completion APIs
//!
//! All clients retry 429 responses with Retry-After / exponential backoff.

mod anthropic;
mod openai;
mod retry;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EvalError, Result};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Input to a model completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    /// 0 falls back to the client's configured limit.
    pub max_tokens: u32,
}

/// Output of a model completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
    pub latency_ms: u64,
}

/// The completion interface the probe runner drives.
#[async_trait]
pub trait ModelClient: Send + Sync + std::fmt::Debug {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse>;
}

/// Provider selection and connection settings. Empty strings mean
/// "use the provider default".
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// "anthropic", "openai" or "openai-compatible".
    pub provider: String,
    pub model: String,
    /// Required for openai-compatible, ignored otherwise.
    pub base_url: String,
    /// Env var holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
}

/// Builds a client from provider configuration.
pub fn new_client(cfg: ProviderConfig) -> Result<Arc<dyn ModelClient>> {
    let ProviderConfig { provider, model, base_url, api_key_env, max_tokens } = cfg;
    let max_tokens = if max_tokens == 0 { DEFAULT_MAX_TOKENS } else { max_tokens };

    match provider.as_str() {
        "anthropic" => {
            let model =
                if model.is_empty() { DEFAULT_ANTHROPIC_MODEL.to_string() } else { model };
            let key_env =
                if api_key_env.is_empty() { "ANTHROPIC_API_KEY" } else { api_key_env.as_str() };
            let api_key = required_api_key(key_env)?;
            Ok(Arc::new(AnthropicClient::new(api_key, model, max_tokens)))
        }

        "openai" => {
            let model = if model.is_empty() { DEFAULT_OPENAI_MODEL.to_string() } else { model };
            let key_env =
                if api_key_env.is_empty() { "OPENAI_API_KEY" } else { api_key_env.as_str() };
            let api_key = required_api_key(key_env)?;
            Ok(Arc::new(OpenAiClient::new(
                api_key,
                model,
                max_tokens,
                DEFAULT_OPENAI_BASE_URL.to_string(),
            )))
        }

        "openai-compatible" => {
            if base_url.is_empty() {
                return Err(EvalError::Provider(
                    "base_url is required for openai-compatible provider".to_string(),
                ));
            }
            if model.is_empty() {
                return Err(EvalError::Provider(
                    "model is required for openai-compatible provider".to_string(),
                ));
            }
            // Key is optional for local providers like Ollama.
            let api_key = if api_key_env.is_empty() {
                String::new()
            } else {
                std::env::var(&api_key_env).unwrap_or_default()
            };
            Ok(Arc::new(OpenAiClient::new(api_key, model, max_tokens, base_url)))
        }

        other => Err(EvalError::Provider(format!(
            "unknown provider: {} (supported: anthropic, openai, openai-compatible)",
            other
        ))),
    }
}

fn required_api_key(key_env: &str) -> Result<String> {
    let api_key = std::env::var(key_env).unwrap_or_default();
    if api_key.is_empty() {
        return Err(EvalError::Provider(format!(
            "environment variable {} is not set",
            key_env
        )));
    }
    Ok(api_key)
}
