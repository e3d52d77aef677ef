//! Mock model client for probe tests without live API calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use agent_evals::error::{EvalError, Result};
use agent_evals::provider::{CompletionRequest, CompletionResponse, ModelClient};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

#[derive(Debug, Clone)]
pub enum ResponseScenario {
    Static(String),
    Sequential(Vec<String>),
    Failure(String),
}

impl ResponseScenario {
    pub fn static_response(response: impl Into<String>) -> Self {
        Self::Static(response.into())
    }

    pub fn sequential(responses: Vec<impl Into<String>>) -> Self {
        Self::Sequential(responses.into_iter().map(Into::into).collect())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

/// One recorded completion call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
}

/// Scenario-driven `ModelClient`. Scenarios are keyed by a substring of
/// the user prompt; the first registered key that matches wins, and
/// prompts matching no key get the default response.
#[derive(Debug)]
pub struct MockModelClient {
    responses: RwLock<Vec<(String, ResponseScenario)>>,
    call_counts: RwLock<HashMap<String, AtomicUsize>>,
    calls: Mutex<Vec<RecordedCall>>,
    default_response: String,
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(Vec::new()),
            call_counts: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            default_response: "Here is the answer. CONFIDENCE: 80".to_string(),
        }
    }

    pub fn set_response(&self, key: &str, scenario: ResponseScenario) {
        self.responses.write().push((key.to_string(), scenario));
        self.call_counts
            .write()
            .insert(key.to_string(), AtomicUsize::new(0));
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.call_counts
            .read()
            .get(key)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn find_scenario(&self, prompt: &str) -> Option<(String, ResponseScenario)> {
        self.responses
            .read()
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(key, scenario)| (key.clone(), scenario.clone()))
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.lock().push(RecordedCall {
            system_prompt: req.system_prompt.clone(),
            user_prompt: req.user_prompt.clone(),
            temperature: req.temperature,
        });

        let Some((key, scenario)) = self.find_scenario(&req.user_prompt) else {
            return Ok(respond(&self.default_response));
        };

        let count = self
            .call_counts
            .read()
            .get(&key)
            .map(|c| c.fetch_add(1, Ordering::SeqCst))
            .unwrap_or(0);

        match scenario {
            ResponseScenario::Static(text) => Ok(respond(&text)),
            ResponseScenario::Sequential(texts) => Ok(respond(&texts[count % texts.len()])),
            ResponseScenario::Failure(message) => Err(EvalError::Provider(message)),
        }
    }
}

fn respond(text: &str) -> CompletionResponse {
    CompletionResponse {
        text: text.to_string(),
        model: "mock-model".to_string(),
        latency_ms: 0,
    }
}

pub struct MockClientBuilder {
    client: MockModelClient,
}

impl MockClientBuilder {
    pub fn new() -> Self {
        Self {
            client: MockModelClient::new(),
        }
    }

    pub fn response(self, key: &str, scenario: ResponseScenario) -> Self {
        self.client.set_response(key, scenario);
        self
    }

    pub fn static_response(self, key: &str, response: impl Into<String>) -> Self {
        self.response(key, ResponseScenario::static_response(response))
    }

    pub fn failure(self, key: &str, message: impl Into<String>) -> Self {
        self.response(key, ResponseScenario::failure(message))
    }

    pub fn default_response(mut self, response: impl Into<String>) -> Self {
        self.client.default_response = response.into();
        self
    }

    pub fn build(self) -> MockModelClient {
        self.client
    }
}

impl Default for MockClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_prompt: &str, temperature: f64) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are a test agent.".to_string(),
            user_prompt: user_prompt.to_string(),
            temperature,
            max_tokens: 0,
        }
    }

    #[tokio::test]
    async fn test_static_scenario() {
        let client = MockClientBuilder::new()
            .static_response("PostgreSQL", "It is 100. CONFIDENCE: 90")
            .build();

        let resp = client
            .complete(request("What about PostgreSQL limits?", 0.0))
            .await
            .unwrap();
        assert_eq!(resp.text, "It is 100. CONFIDENCE: 90");
        assert_eq!(client.call_count("PostgreSQL"), 1);
    }

    #[tokio::test]
    async fn test_sequential_scenario_wraps() {
        let client = MockClientBuilder::new()
            .response("flaky", ResponseScenario::sequential(vec!["first", "second"]))
            .build();

        let r1 = client.complete(request("flaky run", 0.7)).await.unwrap();
        let r2 = client.complete(request("flaky run", 0.7)).await.unwrap();
        let r3 = client.complete(request("flaky run", 0.7)).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r3.text, "first");
    }

    #[tokio::test]
    async fn test_failure_scenario() {
        let client = MockClientBuilder::new()
            .failure("boom", "rate limited")
            .build();

        let err = client.complete(request("boom goes the call", 0.0)).await.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
    }

    #[tokio::test]
    async fn test_default_response_and_call_log() {
        let client = MockModelClient::new();

        let resp = client.complete(request("anything at all", 0.7)).await.unwrap();
        assert!(resp.text.contains("CONFIDENCE"));
        assert_eq!(client.total_calls(), 1);

        let calls = client.recorded_calls();
        assert_eq!(calls[0].temperature, 0.7);
        assert_eq!(calls[0].user_prompt, "anything at all");
    }
}
