//! Domain extraction: scores an agent's text against per-domain keyword lists.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::warn;

use crate::config::{DomainEntry, EvalConfig};
use crate::loader::AgentDefinition;

/// Domain name → extraction score for one agent.
pub type DomainScores = BTreeMap<String, f64>;

/// Agent ID → extracted domain scores.
pub type DomainScoreMap = BTreeMap<String, DomainScores>;

/// Built-in domain labels and the keywords that signal them in agent prompts.
pub fn builtin_domains() -> &'static BTreeMap<String, Vec<String>> {
    static TABLE: OnceLock<BTreeMap<String, Vec<String>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries: &[(&str, &[&str])] = &[
            // Software engineering
            (
                "backend",
                &[
                    "backend",
                    "server",
                    "api",
                    "rest",
                    "graphql",
                    "grpc",
                    "microservice",
                    "service layer",
                    "business logic",
                    "middleware",
                    "endpoint",
                    "request handling",
                    "http server",
                ],
            ),
            (
                "frontend",
                &[
                    "frontend",
                    "front-end",
                    "react",
                    "vue",
                    "angular",
                    "svelte",
                    "css",
                    "html",
                    "browser",
                    "dom",
                    "ui component",
                    "web app",
                    "responsive",
                    "accessibility",
                    "a11y",
                    "tailwind",
                    "next.js",
                    "nuxt",
                ],
            ),
            (
                "databases",
                &[
                    "database",
                    "sql",
                    "postgres",
                    "mysql",
                    "mongodb",
                    "redis",
                    "query optimization",
                    "indexing",
                    "schema",
                    "migration",
                    "orm",
                    "sqlite",
                    "dynamodb",
                    "cassandra",
                    "connection pool",
                    "transaction",
                ],
            ),
            (
                "devops",
                &[
                    "devops",
                    "ci/cd",
                    "pipeline",
                    "docker",
                    "kubernetes",
                    "k8s",
                    "terraform",
                    "ansible",
                    "infrastructure",
                    "deployment",
                    "helm",
                    "github actions",
                    "gitlab ci",
                    "jenkins",
                    "argocd",
                    "container",
                ],
            ),
            (
                "security",
                &[
                    "security",
                    "authentication",
                    "authorization",
                    "oauth",
                    "jwt",
                    "encryption",
                    "vulnerability",
                    "penetration",
                    "owasp",
                    "cors",
                    "csrf",
                    "xss",
                    "rbac",
                    "sso",
                    "zero trust",
                    "secrets management",
                    "tls",
                    "certificate",
                    "firewall",
                    "audit log",
                ],
            ),
            (
                "distributed_systems",
                &[
                    "distributed",
                    "consensus",
                    "replication",
                    "partition",
                    "raft",
                    "paxos",
                    "eventual consistency",
                    "message queue",
                    "kafka",
                    "event-driven",
                    "pub/sub",
                    "rabbitmq",
                    "nats",
                    "grpc streaming",
                    "load balancing",
                    "circuit breaker",
                ],
            ),
            (
                "mobile",
                &[
                    "mobile",
                    "ios",
                    "android",
                    "react native",
                    "flutter",
                    "swift",
                    "kotlin",
                    "xcode",
                    "app store",
                    "google play",
                    "push notification",
                    "deep link",
                    "mobile ui",
                ],
            ),
            (
                "ml_ai",
                &[
                    "machine learning",
                    "deep learning",
                    "neural network",
                    "training",
                    "inference",
                    "pytorch",
                    "tensorflow",
                    "transformer",
                    "fine-tuning",
                    "rag",
                    "embedding",
                    "llm",
                    "prompt engineering",
                    "classification",
                    "regression",
                    "nlp",
                    "computer vision",
                    "reinforcement learning",
                    "diffusion model",
                    "vector database",
                ],
            ),
            (
                "testing",
                &[
                    "testing",
                    "test",
                    "unit test",
                    "integration test",
                    "e2e",
                    "coverage",
                    "tdd",
                    "bdd",
                    "cypress",
                    "playwright",
                    "jest",
                    "pytest",
                    "vitest",
                    "test fixture",
                    "mock",
                    "stub",
                    "snapshot test",
                    "load test",
                    "regression test",
                ],
            ),
            (
                "architecture",
                &[
                    "architecture",
                    "system design",
                    "design pattern",
                    "microservices",
                    "monolith",
                    "event sourcing",
                    "cqrs",
                    "domain-driven",
                    "hexagonal",
                    "clean architecture",
                    "solid",
                    "api gateway",
                    "service mesh",
                    "saga pattern",
                ],
            ),
            (
                "data_science",
                &[
                    "data science",
                    "data analysis",
                    "pandas",
                    "numpy",
                    "jupyter",
                    "visualization",
                    "statistics",
                    "data pipeline",
                    "etl",
                    "data warehouse",
                    "spark",
                    "airflow",
                    "dbt",
                    "feature engineering",
                    "a/b test",
                    "experiment",
                    "dashboard",
                    "data lake",
                    "bigquery",
                    "snowflake",
                    "redshift",
                ],
            ),
            (
                "cloud",
                &[
                    "aws",
                    "azure",
                    "gcp",
                    "cloud",
                    "s3",
                    "ec2",
                    "lambda",
                    "serverless",
                    "cloud function",
                    "cloud run",
                    "iam",
                    "vpc",
                    "cdn",
                    "route 53",
                    "cloudfront",
                    "load balancer",
                    "auto scaling",
                    "fargate",
                    "ecs",
                    "cloud formation",
                ],
            ),
            (
                "observability",
                &[
                    "observability",
                    "monitoring",
                    "logging",
                    "tracing",
                    "metrics",
                    "prometheus",
                    "grafana",
                    "datadog",
                    "opentelemetry",
                    "alerting",
                    "sli",
                    "slo",
                    "sla",
                    "incident",
                    "on-call",
                    "pagerduty",
                    "kibana",
                    "elasticsearch",
                    "apm",
                ],
            ),
            (
                "api_design",
                &[
                    "api design",
                    "openapi",
                    "swagger",
                    "rest api",
                    "api versioning",
                    "rate limiting",
                    "pagination",
                    "hateoas",
                    "api gateway",
                    "webhook",
                    "idempotent",
                    "api contract",
                    "protobuf",
                    "schema registry",
                    "backward compatible",
                ],
            ),
            // Non-technical
            (
                "legal",
                &[
                    "legal",
                    "law",
                    "regulation",
                    "compliance",
                    "contract",
                    "liability",
                    "intellectual property",
                    "gdpr",
                    "hipaa",
                    "terms of service",
                    "privacy policy",
                    "copyright",
                    "patent",
                ],
            ),
            (
                "medical",
                &[
                    "medical",
                    "clinical",
                    "diagnosis",
                    "treatment",
                    "patient",
                    "pharmacology",
                    "symptom",
                    "dosage",
                    "contraindication",
                    "clinical trial",
                    "healthcare",
                    "therapeutic",
                ],
            ),
            (
                "financial",
                &[
                    "financial",
                    "accounting",
                    "revenue",
                    "profit",
                    "balance sheet",
                    "investment",
                    "portfolio",
                    "tax",
                    "audit",
                    "budgeting",
                    "financial model",
                    "valuation",
                    "equity",
                    "debt",
                    "forex",
                ],
            ),
            (
                "writing",
                &[
                    "writing",
                    "copywriting",
                    "content",
                    "blog",
                    "article",
                    "editorial",
                    "prose",
                    "narrative",
                    "technical writing",
                    "documentation",
                    "style guide",
                    "tone of voice",
                ],
            ),
        ];
        entries
            .iter()
            .map(|(name, kws)| {
                (
                    name.to_string(),
                    kws.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    })
}

/// Builds the domain keyword map from configuration. With no `domains`
/// entries, all built-in domains apply. Entries are either built-in
/// references or named keyword lists, optionally extending a built-in.
pub fn resolve_domains(config: &EvalConfig) -> BTreeMap<String, Vec<String>> {
    let entries = match &config.domains {
        Some(entries) if !entries.is_empty() => entries,
        _ => return builtin_domains().clone(),
    };

    let mut result = BTreeMap::new();
    for entry in entries {
        match entry {
            DomainEntry::Builtin(name) => {
                if let Some(keywords) = builtin_domains().get(name) {
                    result.insert(name.clone(), keywords.clone());
                } else {
                    warn!(domain = %name, "Unknown built-in domain, skipping");
                }
            }
            DomainEntry::Custom {
                name,
                extends,
                keywords,
            } => {
                if name.is_empty() {
                    continue;
                }
                if extends.as_deref() == Some("builtin") {
                    if let Some(builtin) = builtin_domains().get(name) {
                        let mut merged = builtin.clone();
                        merged.extend(keywords.iter().cloned());
                        result.insert(name.clone(), merged);
                    } else if !keywords.is_empty() {
                        // extends an unknown built-in, treat as custom-only
                        result.insert(name.clone(), keywords.clone());
                    }
                } else if !keywords.is_empty() {
                    result.insert(name.clone(), keywords.clone());
                }
            }
        }
    }

    result
}

/// Lowercases and joins a domain label with underscores so claimed domains,
/// config names and question banks agree on spelling.
pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.to_lowercase().replace([' ', '-'], "_")
}

/// Extracts domains from an agent's definition with relevance scores in
/// [0, 1]. Explicitly claimed domains always score 1.0.
pub fn extract_domains(
    agent: &AgentDefinition,
    domain_keywords: &BTreeMap<String, Vec<String>>,
) -> DomainScores {
    let text = agent.full_context().to_lowercase();
    let mut scores = DomainScores::new();

    for domain in &agent.claimed_domains {
        scores.insert(normalize_domain(domain), 1.0);
    }

    // Score = hits / (keywords * 0.5). The 0.5 factor means an agent
    // matching half its domain's keywords reaches 1.0, reflecting that no
    // single prompt will use every keyword in a domain.
    for (domain, keywords) in domain_keywords {
        let hits: usize = keywords.iter().map(|kw| text.matches(kw.as_str()).count()).sum();
        if hits == 0 {
            continue;
        }
        let score = (hits as f64 / (keywords.len() as f64 * 0.5)).min(1.0);
        let entry = scores.entry(domain.clone()).or_insert(0.0);
        if score > *entry {
            *entry = score;
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_with_prompt(prompt: &str) -> AgentDefinition {
        AgentDefinition {
            id: "test".into(),
            name: "Test".into(),
            system_prompt: prompt.into(),
            ..Default::default()
        }
    }

    #[test]
    fn keyword_hits_produce_bounded_scores() {
        let agent = agent_with_prompt(
            "You are a backend engineer. You build REST api endpoints, \
             design the service layer, and handle middleware for the http server.",
        );
        let scores = extract_domains(&agent, builtin_domains());
        let backend = scores.get("backend").copied().unwrap_or(0.0);
        assert!(backend > 0.0 && backend <= 1.0);
        for score in scores.values() {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[test]
    fn claimed_domains_always_score_one() {
        let mut agent = agent_with_prompt("A very short prompt.");
        agent.claimed_domains = vec!["Machine Learning".into(), "backend".into()];
        let scores = extract_domains(&agent, builtin_domains());
        assert_eq!(scores.get("machine_learning"), Some(&1.0));
        assert_eq!(scores.get("backend"), Some(&1.0));
    }

    #[test]
    fn dense_keyword_use_caps_at_one() {
        let prompt = "sql sql sql postgres postgres mysql mongodb redis database \
                      schema schema migration orm sqlite transaction indexing"
            .repeat(3);
        let agent = agent_with_prompt(&prompt);
        let scores = extract_domains(&agent, builtin_domains());
        assert_eq!(scores.get("databases"), Some(&1.0));
    }

    #[test]
    fn zero_hit_domains_are_omitted() {
        let agent = agent_with_prompt("You write poetry about mountains.");
        let scores = extract_domains(&agent, builtin_domains());
        assert!(!scores.contains_key("databases"));
        assert!(!scores.contains_key("devops"));
    }

    #[test]
    fn skills_and_rules_feed_extraction() {
        let mut agent = agent_with_prompt("General helper.");
        agent.skills = vec!["kubernetes deployment".into(), "terraform".into()];
        agent.rules = vec!["prefer docker containers".into()];
        let scores = extract_domains(&agent, builtin_domains());
        assert!(scores.get("devops").copied().unwrap_or(0.0) > 0.0);
    }

    #[test]
    fn resolve_defaults_to_builtins() {
        let config = EvalConfig::default();
        let resolved = resolve_domains(&config);
        assert_eq!(resolved.len(), builtin_domains().len());
        assert!(resolved.contains_key("backend"));
    }

    #[test]
    fn resolve_selects_named_builtins() {
        let config: EvalConfig = serde_yaml_bw::from_str(
            "domains:\n  - backend\n  - security\n  - no_such_domain\n",
        )
        .unwrap();
        let resolved = resolve_domains(&config);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains_key("backend"));
        assert!(resolved.contains_key("security"));
    }

    #[test]
    fn resolve_extends_builtin_keywords() {
        let config: EvalConfig = serde_yaml_bw::from_str(
            "domains:\n  - name: backend\n    extends: builtin\n    keywords: [fastify, actix]\n",
        )
        .unwrap();
        let resolved = resolve_domains(&config);
        let backend = resolved.get("backend").unwrap();
        assert!(backend.contains(&"api".to_string()));
        assert!(backend.contains(&"fastify".to_string()));
        assert!(backend.contains(&"actix".to_string()));
    }

    #[test]
    fn resolve_accepts_custom_domains() {
        let config: EvalConfig = serde_yaml_bw::from_str(
            "domains:\n  - name: gardening\n    keywords: [soil, compost, pruning]\n",
        )
        .unwrap();
        let resolved = resolve_domains(&config);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("gardening").map(Vec::len), Some(3));
    }

    #[test]
    fn normalize_flattens_spacing_and_case() {
        assert_eq!(normalize_domain("Machine Learning"), "machine_learning");
        assert_eq!(normalize_domain("front-end"), "front_end");
        assert_eq!(normalize_domain("backend"), "backend");
    }
}
