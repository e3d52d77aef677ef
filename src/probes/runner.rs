//! Live probe execution.
//!
//! Drives generated probe questions against a model provider with bounded
//! concurrency. Every probe makes one deterministic call (temperature 0)
//! followed by a batch of stochastic calls (temperature 0.7), pausing
//! between stochastic calls to stay under provider rate limits. A panic
//! while handling one probe is isolated to that probe and recorded as an
//! errored response.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::loader::AgentDefinition;
use crate::probes::parser::parse_probe_response;
use crate::probes::questions::{BOUNDARY_PROBE_TEMPLATE, ProbeQuestion};
use crate::probes::scoring::{
    AgentProbeResults, ProbeDetail, ResponseRecord, score_agent_probes,
};
use crate::provider::{CompletionRequest, ModelClient};

/// Results from a full live probe run.
#[derive(Debug, Clone)]
pub struct LiveProbeReport {
    pub agent_results: BTreeMap<String, AgentProbeResults>,
    pub total_calls: usize,
    pub budget: usize,
    pub timestamp: String,
}

/// Called after each probe completes, under the runner's state lock.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str, &str) + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Heated runs per probe; 0 means the default of 5.
    pub stochastic_runs: usize,
    /// Pause after each stochastic call; zero means the default of 300ms.
    pub batch_delay: Duration,
    /// Concurrent probes in flight; 0 means sequential.
    pub concurrency: usize,
}

struct RunState {
    results: BTreeMap<String, AgentProbeResults>,
    total_calls: usize,
    completed: usize,
}

/// Executes live probes against agents via the model provider.
pub async fn run_live_probes(
    agents: &[AgentDefinition],
    questions: &[ProbeQuestion],
    client: Arc<dyn ModelClient>,
    cfg: RunConfig,
    progress: Option<ProgressCallback>,
) -> LiveProbeReport {
    let stochastic_runs = if cfg.stochastic_runs == 0 { 5 } else { cfg.stochastic_runs };
    let batch_delay =
        if cfg.batch_delay.is_zero() { Duration::from_millis(300) } else { cfg.batch_delay };
    let concurrency = if cfg.concurrency == 0 { 1 } else { cfg.concurrency };

    let prompts: HashMap<&str, &str> = agents
        .iter()
        .map(|a| (a.id.as_str(), a.system_prompt.as_str()))
        .collect();

    let mut results = BTreeMap::new();
    for agent in agents {
        results.insert(agent.id.clone(), AgentProbeResults::new(&agent.id));
    }

    let state = Arc::new(Mutex::new(RunState { results, total_calls: 0, completed: 0 }));
    let total = questions.len();
    let semaphore = Arc::new(Semaphore::new(concurrency));

    debug!(
        probes = total,
        stochastic_runs, concurrency, "Starting live probe run"
    );

    let mut submitted = Vec::new();
    let handles: Vec<_> = questions
        .iter()
        .filter_map(|q| {
            let system_prompt = prompts.get(q.target_agent.as_str())?.to_string();
            let probe = q.clone();
            submitted.push(q.clone());

            let sem = Arc::clone(&semaphore);
            let client = Arc::clone(&client);
            let state = Arc::clone(&state);
            let progress = progress.clone();

            Some(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");

                let prompt = BOUNDARY_PROBE_TEMPLATE.replacen("%s", &probe.text, 1);
                let mut responses = Vec::new();

                // Deterministic run
                let resp = client
                    .complete(CompletionRequest {
                        system_prompt: system_prompt.clone(),
                        user_prompt: prompt.clone(),
                        temperature: 0.0,
                        max_tokens: 0,
                    })
                    .await;
                state.lock().total_calls += 1;
                responses.push(to_record(0, 0.0, resp));

                // Stochastic runs
                for run in 1..=stochastic_runs {
                    let resp = client
                        .complete(CompletionRequest {
                            system_prompt: system_prompt.clone(),
                            user_prompt: prompt.clone(),
                            temperature: 0.7,
                            max_tokens: 0,
                        })
                        .await;
                    state.lock().total_calls += 1;
                    responses.push(to_record(run, 0.7, resp));

                    tokio::time::sleep(batch_delay).await;
                }

                let detail = ProbeDetail {
                    probe_id: probe.id.clone(),
                    question: probe.text.clone(),
                    domain: probe.domain.clone(),
                    probe_type: probe.probe_type,
                    expected: probe.expected_behavior.clone(),
                    responses,
                };

                let mut st = state.lock();
                if let Some(entry) = st.results.get_mut(&probe.target_agent) {
                    entry.probes_run += 1;
                    entry.details.push(detail);
                }
                st.completed += 1;
                let done = st.completed;
                if let Some(cb) = &progress {
                    cb(done, total, &probe.target_agent, &probe.id);
                }
            }))
        })
        .collect();

    let joined = futures::future::join_all(handles).await;

    // A panicked probe still gets a detail entry so the report accounts
    // for every submitted probe.
    for (result, probe) in joined.into_iter().zip(submitted) {
        if let Err(e) = result {
            error!(probe_id = %probe.id, error = %e, "Probe task panicked");
            let mut st = state.lock();
            if let Some(entry) = st.results.get_mut(&probe.target_agent) {
                entry.probes_run += 1;
                entry.details.push(ProbeDetail {
                    probe_id: probe.id.clone(),
                    question: probe.text.clone(),
                    domain: probe.domain.clone(),
                    probe_type: probe.probe_type,
                    expected: probe.expected_behavior.clone(),
                    responses: vec![ResponseRecord {
                        run: 0,
                        error: Some(format!("panic: {}", e)),
                        ..Default::default()
                    }],
                });
            }
            st.completed += 1;
            let done = st.completed;
            if let Some(cb) = &progress {
                cb(done, total, &probe.target_agent, &probe.id);
            }
        }
    }

    let (mut results, total_calls) = {
        let mut st = state.lock();
        (std::mem::take(&mut st.results), st.total_calls)
    };

    for agent_results in results.values_mut() {
        score_agent_probes(agent_results);
    }

    LiveProbeReport {
        agent_results: results,
        total_calls,
        budget: questions.len() * (1 + stochastic_runs),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

fn to_record(
    run: usize,
    temperature: f64,
    resp: crate::error::Result<crate::provider::CompletionResponse>,
) -> ResponseRecord {
    match resp {
        Err(e) => ResponseRecord {
            run,
            temperature,
            error: Some(e.to_string()),
            ..Default::default()
        },
        Ok(r) => {
            let parsed = parse_probe_response(&r.text);
            ResponseRecord {
                run,
                temperature,
                confidence: parsed.confidence,
                hedging_score: parsed.hedging_score,
                is_refusal: parsed.is_refusal,
                raw: r.text,
                error: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::questions::ProbeType;
    use crate::provider::CompletionResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics when the prompt contains the trigger, answers hedgingly
    /// otherwise.
    #[derive(Debug)]
    struct PanicClient {
        trigger: &'static str,
    }

    #[async_trait]
    impl ModelClient for PanicClient {
        async fn complete(
            &self,
            req: CompletionRequest,
        ) -> crate::error::Result<CompletionResponse> {
            if req.user_prompt.contains(self.trigger) {
                panic!("simulated crash in response handling");
            }
            Ok(CompletionResponse {
                text: "I'm not sure about that. Confidence: 30".into(),
                model: "test-model".into(),
                latency_ms: 0,
            })
        }
    }

    fn test_agent(id: &str) -> AgentDefinition {
        AgentDefinition {
            id: id.into(),
            system_prompt: "You are a test agent.".into(),
            ..Default::default()
        }
    }

    fn question(id: &str, text: &str, target: &str, probe_type: ProbeType) -> ProbeQuestion {
        ProbeQuestion {
            id: id.into(),
            text: text.into(),
            target_agent: target.into(),
            domain: "testing".into(),
            probe_type,
            expected_behavior: "hedge".into(),
        }
    }

    fn fast_config() -> RunConfig {
        RunConfig {
            stochastic_runs: 1,
            batch_delay: Duration::from_millis(1),
            concurrency: 1,
        }
    }

    #[tokio::test]
    async fn panicking_probe_is_isolated_and_recorded() {
        let agents = vec![test_agent("agent1")];
        let questions = vec![
            question("panic-probe", "TRIGGER_PANIC", "agent1", ProbeType::Boundary),
            question("normal-probe", "What is a test?", "agent1", ProbeType::Calibration),
        ];

        let progress_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&progress_calls);
        let progress: ProgressCallback = Arc::new(move |_done, _total, _agent, _probe| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let report = run_live_probes(
            &agents,
            &questions,
            Arc::new(PanicClient { trigger: "TRIGGER_PANIC" }),
            fast_config(),
            Some(progress),
        )
        .await;

        let results = report.agent_results.get("agent1").expect("results for agent1");
        assert_eq!(results.probes_run, 2);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 2);

        let panicked = results
            .details
            .iter()
            .find(|d| d.probe_id == "panic-probe")
            .expect("panic-probe detail");
        assert_eq!(panicked.responses.len(), 1);
        let err = panicked.responses[0].error.as_deref().unwrap();
        assert!(err.contains("panic:"), "got {err:?}");

        let normal = results
            .details
            .iter()
            .find(|d| d.probe_id == "normal-probe")
            .expect("normal-probe detail");
        assert!(!normal.responses.is_empty());
        assert!(normal.responses[0].error.is_none());
    }

    #[tokio::test]
    async fn deterministic_run_comes_first() {
        let agents = vec![test_agent("agent1")];
        let questions =
            vec![question("p1", "What is a test?", "agent1", ProbeType::Boundary)];

        let report = run_live_probes(
            &agents,
            &questions,
            Arc::new(PanicClient { trigger: "NEVER" }),
            RunConfig {
                stochastic_runs: 2,
                batch_delay: Duration::from_millis(1),
                concurrency: 1,
            },
            None,
        )
        .await;

        let detail = &report.agent_results["agent1"].details[0];
        assert_eq!(detail.responses.len(), 3);
        assert_eq!(detail.responses[0].run, 0);
        assert_eq!(detail.responses[0].temperature, 0.0);
        assert_eq!(detail.responses[1].temperature, 0.7);
        assert_eq!(detail.responses[1].confidence, Some(30.0));
        assert_eq!(report.total_calls, 3);
        assert_eq!(report.budget, 3);
    }

    #[tokio::test]
    async fn unknown_target_agents_are_skipped() {
        let agents = vec![test_agent("agent1"), test_agent("idle")];
        let questions = vec![
            question("p1", "What is a test?", "agent1", ProbeType::Boundary),
            question("p2", "Hello?", "ghost", ProbeType::Boundary),
        ];

        let report = run_live_probes(
            &agents,
            &questions,
            Arc::new(PanicClient { trigger: "NEVER" }),
            fast_config(),
            None,
        )
        .await;

        assert_eq!(report.total_calls, 2);
        assert_eq!(report.budget, 4);
        assert!(!report.agent_results.contains_key("ghost"));
        assert_eq!(report.agent_results["agent1"].probes_run, 1);

        // Loaded agents without probes still appear, unscored.
        let idle = &report.agent_results["idle"];
        assert_eq!(idle.probes_run, 0);
        assert_eq!(idle.boundary_score, 0.0);
    }

    #[tokio::test]
    async fn hedging_responses_drive_boundary_score() {
        let agents = vec![test_agent("agent1")];
        let questions =
            vec![question("p1", "Out of scope?", "agent1", ProbeType::Boundary)];

        let report = run_live_probes(
            &agents,
            &questions,
            Arc::new(PanicClient { trigger: "NEVER" }),
            fast_config(),
            None,
        )
        .await;

        // Mock always hedges ("I'm not sure", 0.9) with confidence 30.
        let results = &report.agent_results["agent1"];
        assert_eq!(results.boundary_score, 1.0);
        assert!(report.timestamp.contains('T'));
    }
}
