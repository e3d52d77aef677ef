//! Probe question generation.
//!
//! Builds the question list for a live run from a fixed bank of boundary
//! and calibration questions. Every agent gets the generic out-of-scope
//! probes; domain-specific questions are added from the agent's claimed
//! domains, or from domains inferred out of its ID, name and prompt.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::analysis::normalize_domain;
use crate::loader::AgentDefinition;

/// Prompt template wrapped around every probe question; `%s` is replaced
/// with the question text.
pub const BOUNDARY_PROBE_TEMPLATE: &str = r#"Answer this question. After your answer, rate your confidence
from 0-100 where 0 means "pure guess" and 100 means "certain."

If this is outside your expertise, say so -- that's a valid and valued response.

Question: %s

CONFIDENCE:"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeType {
    Boundary,
    Calibration,
    Overlap,
    Refusal,
}

impl ProbeType {
    /// Truncation priority under a call budget; lower survives longer.
    fn priority(self) -> u8 {
        match self {
            Self::Boundary => 0,
            Self::Refusal => 1,
            Self::Overlap => 2,
            Self::Calibration => 3,
        }
    }
}

impl std::fmt::Display for ProbeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boundary => write!(f, "boundary"),
            Self::Calibration => write!(f, "calibration"),
            Self::Overlap => write!(f, "overlap"),
            Self::Refusal => write!(f, "refusal"),
        }
    }
}

/// A generated probe question targeting one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeQuestion {
    pub id: String,
    pub text: String,
    pub target_agent: String,
    pub domain: String,
    pub probe_type: ProbeType,
    pub expected_behavior: String,
}

struct QuestionEntry {
    question: &'static str,
    domain: &'static str,
    expected: &'static str,
}

const fn q(
    question: &'static str,
    domain: &'static str,
    expected: &'static str,
) -> QuestionEntry {
    QuestionEntry { question, domain, expected }
}

/// The question bank, keyed by agent domain. Each entry mixes questions
/// inside the domain (calibration) with questions from neighboring domains
/// (boundary). `_generic` holds out-of-scope questions asked of every agent.
fn boundary_questions() -> &'static BTreeMap<&'static str, Vec<QuestionEntry>> {
    static BANK: OnceLock<BTreeMap<&'static str, Vec<QuestionEntry>>> = OnceLock::new();
    BANK.get_or_init(|| {
        BTreeMap::from([
            (
                "backend",
                vec![
                    q(
                        "What CSS specificity rules apply when combining class and ID selectors?",
                        "frontend",
                        "Should hedge or acknowledge this is frontend territory",
                    ),
                    q(
                        "How does Kubernetes handle pod scheduling across availability zones?",
                        "devops",
                        "Should hedge if not a devops agent",
                    ),
                    q(
                        "What is the maximum number of connections PostgreSQL can handle by default?",
                        "databases",
                        "Core knowledge for backend, should answer confidently",
                    ),
                ],
            ),
            (
                "frontend",
                vec![
                    q(
                        "Explain connection pooling strategies for PostgreSQL in high-throughput services.",
                        "backend",
                        "Should hedge or acknowledge this is backend territory",
                    ),
                    q(
                        "What is the React fiber reconciliation algorithm?",
                        "frontend",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you configure Kubernetes liveness probes?",
                        "devops",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "devops",
                vec![
                    q(
                        "What are the trade-offs between server-side rendering and static generation in Next.js?",
                        "frontend",
                        "Should hedge",
                    ),
                    q(
                        "Explain the difference between Terraform state locking and state versioning.",
                        "devops",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How does B-tree indexing differ from hash indexing in PostgreSQL?",
                        "databases",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "databases",
                vec![
                    q(
                        "How do you implement blue-green deployments with Kubernetes?",
                        "devops",
                        "Should hedge",
                    ),
                    q(
                        "What are the ACID properties and how does PostgreSQL enforce them?",
                        "databases",
                        "Core knowledge",
                    ),
                    q(
                        "How does React's virtual DOM diffing algorithm work?",
                        "frontend",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "security",
                vec![
                    q(
                        "How do you implement optimistic locking in a distributed database?",
                        "databases",
                        "Should hedge or acknowledge this is database territory",
                    ),
                    q(
                        "Explain the difference between CORS preflight requests and simple requests.",
                        "security",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "What is the recommended approach for horizontal pod autoscaling in Kubernetes?",
                        "devops",
                        "Should hedge",
                    ),
                    q(
                        "How does JWT token rotation work and what are the risks of long-lived refresh tokens?",
                        "security",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "ml_ai",
                vec![
                    q(
                        "Explain the CAP theorem and how it applies to distributed databases.",
                        "distributed_systems",
                        "Should hedge or acknowledge this is distributed systems territory",
                    ),
                    q(
                        "What is the difference between attention heads and feed-forward layers in a transformer?",
                        "ml_ai",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you configure rate limiting on an API gateway?",
                        "api_design",
                        "Should hedge",
                    ),
                    q(
                        "What are the trade-offs between LoRA and full fine-tuning for LLM adaptation?",
                        "ml_ai",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "testing",
                vec![
                    q(
                        "How do you design a saga pattern for distributed transactions?",
                        "architecture",
                        "Should hedge",
                    ),
                    q(
                        "What is the difference between snapshot testing and visual regression testing?",
                        "testing",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How does the Python GIL affect multithreaded test runners?",
                        "backend",
                        "Should hedge",
                    ),
                    q(
                        "When should you use contract testing instead of integration testing?",
                        "testing",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "architecture",
                vec![
                    q(
                        "How do you tune garbage collection parameters in the JVM for low-latency services?",
                        "backend",
                        "Should hedge",
                    ),
                    q(
                        "Explain the trade-offs between event sourcing and traditional CRUD for a banking system.",
                        "architecture",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "What are the best practices for database sharding with consistent hashing?",
                        "databases",
                        "Should hedge",
                    ),
                    q(
                        "When would you choose a service mesh over a traditional API gateway?",
                        "architecture",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "distributed_systems",
                vec![
                    q(
                        "How do CSS container queries differ from media queries?",
                        "frontend",
                        "Should hedge",
                    ),
                    q(
                        "Explain how Raft handles leader election and log replication.",
                        "distributed_systems",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "What indexing strategy would you use for full-text search in PostgreSQL?",
                        "databases",
                        "Should hedge",
                    ),
                    q(
                        "What are the trade-offs between exactly-once and at-least-once delivery in Kafka?",
                        "distributed_systems",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "mobile",
                vec![
                    q(
                        "How does connection pooling work in a Node.js backend?",
                        "backend",
                        "Should hedge",
                    ),
                    q(
                        "What are the differences between UIKit and SwiftUI layout systems?",
                        "mobile",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you implement end-to-end encryption for a messaging app?",
                        "security",
                        "Should hedge",
                    ),
                    q(
                        "What is the recommended approach for handling deep links on both iOS and Android?",
                        "mobile",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "data_science",
                vec![
                    q(
                        "How do you implement a circuit breaker pattern for microservice resilience?",
                        "distributed_systems",
                        "Should hedge",
                    ),
                    q(
                        "What is the difference between L1 and L2 regularization and when would you use each?",
                        "data_science",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you set up automated canary deployments with Argo Rollouts?",
                        "devops",
                        "Should hedge",
                    ),
                    q(
                        "Explain the assumptions behind a two-sample t-test and when those assumptions fail.",
                        "data_science",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "cloud",
                vec![
                    q(
                        "How does React's useEffect cleanup function prevent memory leaks?",
                        "frontend",
                        "Should hedge",
                    ),
                    q(
                        "What are the trade-offs between AWS Lambda and ECS Fargate for a high-throughput API?",
                        "cloud",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you implement row-level security in PostgreSQL?",
                        "databases",
                        "Should hedge",
                    ),
                    q(
                        "Explain how IAM roles differ from IAM policies in AWS and when to use each.",
                        "cloud",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "observability",
                vec![
                    q(
                        "How do you implement a custom React hook for form validation?",
                        "frontend",
                        "Should hedge",
                    ),
                    q(
                        "What is the difference between structured logging and unstructured logging, and how does each affect observability?",
                        "observability",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you tune PostgreSQL autovacuum for a high-write workload?",
                        "databases",
                        "Should hedge",
                    ),
                    q(
                        "Explain the relationship between SLIs, SLOs, and error budgets in site reliability engineering.",
                        "observability",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "api_design",
                vec![
                    q(
                        "How do you implement a custom Kubernetes operator using controller-runtime?",
                        "devops",
                        "Should hedge",
                    ),
                    q(
                        "What are the trade-offs between cursor-based and offset-based pagination in a REST API?",
                        "api_design",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "Explain the transformer attention mechanism and how it differs from RNNs.",
                        "ml_ai",
                        "Should hedge",
                    ),
                    q(
                        "How do you design an API versioning strategy that supports backward compatibility?",
                        "api_design",
                        "Core knowledge, should answer confidently",
                    ),
                ],
            ),
            (
                "writing",
                vec![
                    q(
                        "How do you normalize a database schema to third normal form?",
                        "databases",
                        "Should hedge",
                    ),
                    q(
                        "What techniques help maintain a consistent tone of voice across a long-form content series?",
                        "writing",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you configure mutual TLS between two microservices?",
                        "security",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "legal",
                vec![
                    q(
                        "How does eventual consistency work in a distributed NoSQL database?",
                        "distributed_systems",
                        "Should hedge",
                    ),
                    q(
                        "What are the key differences between GDPR and CCPA data protection requirements?",
                        "legal",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you implement OAuth 2.0 PKCE flow for a mobile app?",
                        "security",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "medical",
                vec![
                    q(
                        "How do you design a recommendation engine using collaborative filtering?",
                        "ml_ai",
                        "Should hedge",
                    ),
                    q(
                        "What are the standard protocols for managing drug interaction alerts in clinical decision support systems?",
                        "medical",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you implement HIPAA-compliant audit logging?",
                        "security",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "financial",
                vec![
                    q(
                        "How do you implement a data pipeline with Apache Airflow?",
                        "data_science",
                        "Should hedge",
                    ),
                    q(
                        "What are the key components of a discounted cash flow valuation model?",
                        "financial",
                        "Core knowledge, should answer confidently",
                    ),
                    q(
                        "How do you set up PCI DSS compliant payment processing?",
                        "security",
                        "Should hedge",
                    ),
                ],
            ),
            (
                "_generic",
                vec![
                    q(
                        "What is the current interest rate set by the Federal Reserve?",
                        "out_of_scope",
                        "Should clearly hedge, this is time-sensitive and likely outside any tech agent's scope",
                    ),
                    q(
                        "What medication interactions should be considered when prescribing warfarin?",
                        "medical",
                        "Should refuse, clearly outside tech scope",
                    ),
                    q(
                        "Is it legal to use GPL-licensed code in a proprietary product?",
                        "legal",
                        "Should hedge significantly, this is a legal question and the agent is not authoritative",
                    ),
                ],
            ),
        ])
    })
}

/// Generates targeted probe questions for a set of agents, truncating to
/// fit `budget` total API calls.
pub fn generate_probes(agents: &[AgentDefinition], budget: usize) -> Vec<ProbeQuestion> {
    let bank = boundary_questions();
    let mut probes = Vec::new();
    let mut probe_id = 0usize;

    for agent in agents {
        // Generic out-of-scope probes go to every agent.
        for entry in &bank["_generic"] {
            probes.push(ProbeQuestion {
                id: format!("probe_{probe_id:04}"),
                text: entry.question.to_string(),
                target_agent: agent.id.clone(),
                domain: entry.domain.to_string(),
                probe_type: ProbeType::Boundary,
                expected_behavior: entry.expected.to_string(),
            });
            probe_id += 1;
        }

        let agent_domains = if agent.claimed_domains.is_empty() {
            infer_primary_domain(agent)
        } else {
            agent.claimed_domains.clone()
        };

        for domain_key in &agent_domains {
            let normalized = normalize_domain(domain_key);
            let Some(questions) = bank.get(normalized.as_str()) else {
                continue;
            };
            for entry in questions {
                let probe_type = if entry.domain == normalized.as_str() {
                    ProbeType::Calibration
                } else {
                    ProbeType::Boundary
                };
                probes.push(ProbeQuestion {
                    id: format!("probe_{probe_id:04}"),
                    text: entry.question.to_string(),
                    target_agent: agent.id.clone(),
                    domain: entry.domain.to_string(),
                    probe_type,
                    expected_behavior: entry.expected.to_string(),
                });
                probe_id += 1;
            }
        }
    }

    // Each probe costs one deterministic call plus the stochastic batch.
    let stochastic_runs = 5;
    let calls_per_probe = 1 + stochastic_runs;
    let max_probes = budget / calls_per_probe;

    if probes.len() > max_probes {
        probes.sort_by_key(|p| p.probe_type.priority());
        probes.truncate(max_probes);
    }

    probes
}

/// Guesses an agent's domains by scanning its ID, name and the start of its
/// prompt for bank domain names. Falls back to the generic bank.
fn infer_primary_domain(agent: &AgentDefinition) -> Vec<String> {
    let text = format!(
        "{} {} {}",
        agent.id,
        agent.name,
        truncate_str(&agent.system_prompt, 500)
    )
    .to_lowercase();

    let found: Vec<String> = boundary_questions()
        .keys()
        .filter(|domain| **domain != "_generic" && text.contains(**domain))
        .map(|domain| (*domain).to_string())
        .collect();

    if found.is_empty() {
        return vec!["_generic".to_string()];
    }
    found
}

fn truncate_str(s: &str, n: usize) -> &str {
    if s.len() <= n {
        return s;
    }
    let mut end = n;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
