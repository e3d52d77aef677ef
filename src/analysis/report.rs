//! Static-analysis aggregation: composes extraction, overlap, gap and
//! scoring results into one report with compiled issues and an overall score.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::domains::{self, DomainScoreMap, builtin_domains};
use crate::analysis::gaps::{self, GapResult, GapVerdict};
use crate::analysis::overlap::{self, OverlapResult, OverlapVerdict};
use crate::analysis::scoring::{self, AgentScore};
use crate::config::EvalConfig;
use crate::loader::AgentDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Conflict,
    Overlap,
    Gap,
    Boundary,
    Uncertainty,
}

/// A finding from static analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    pub agents: Vec<String>,
    pub score: f64,
}

/// The complete result of static analysis.
#[derive(Debug, Clone)]
pub struct StaticReport {
    pub agents: Vec<AgentDefinition>,
    pub domain_map: DomainScoreMap,
    /// e.g. "18 built-in domains" or "3 built-in + 2 custom domains"
    pub domain_summary: String,
    pub overlaps: Vec<OverlapResult>,
    pub gaps: Vec<GapResult>,
    pub agent_scores: BTreeMap<String, AgentScore>,
    pub issues: Vec<Issue>,
    pub overall: f64,
}

impl StaticReport {
    pub fn has_failures(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

/// Runs all static checks on a set of agent definitions.
pub fn run_static_analysis(agents: Vec<AgentDefinition>, config: &EvalConfig) -> StaticReport {
    let resolved_domains = domains::resolve_domains(config);

    let mut domain_map = DomainScoreMap::new();
    for agent in &agents {
        domain_map.insert(agent.id.clone(), domains::extract_domains(agent, &resolved_domains));
    }

    let overlaps = overlap::compute_overlaps(&agents, &domain_map);

    // Gap universe: resolved domains plus everything extraction surfaced.
    let mut all_domains: BTreeSet<String> = resolved_domains.keys().cloned().collect();
    for scores in domain_map.values() {
        all_domains.extend(scores.keys().cloned());
    }

    let gaps = gaps::find_gaps(&all_domains, &domain_map);

    let mut agent_scores = BTreeMap::new();
    for agent in &agents {
        agent_scores.insert(agent.id.clone(), scoring::score_agent(agent, &domain_map, &overlaps));
    }

    let issues = compile_issues(&overlaps, &gaps, &agent_scores, config);

    let overall = if issues.is_empty() {
        1.0
    } else {
        let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
        let warnings = issues.iter().filter(|i| i.severity == Severity::Warning).count();
        (1.0 - errors as f64 * 0.2 - warnings as f64 * 0.05).max(0.0)
    };

    debug!(
        agents = agents.len(),
        overlaps = overlaps.len(),
        gaps = gaps.len(),
        issues = issues.len(),
        overall,
        "Static analysis complete"
    );

    StaticReport {
        agents,
        domain_map,
        domain_summary: build_domain_summary(&resolved_domains),
        overlaps,
        gaps,
        agent_scores,
        issues,
        overall,
    }
}

fn compile_issues(
    overlaps: &[OverlapResult],
    gaps: &[GapResult],
    agent_scores: &BTreeMap<String, AgentScore>,
    config: &EvalConfig,
) -> Vec<Issue> {
    let max_overlap = config.thresholds.max_overlap_score;
    let mut issues = Vec::new();

    for o in overlaps {
        if o.verdict == OverlapVerdict::Conflict {
            let mut msg = format!(
                "Conflicting instructions between '{}' and '{}'",
                o.agent_a, o.agent_b
            );
            if !o.conflicts.is_empty() {
                let limit = o.conflicts.len().min(3);
                msg.push_str(": ");
                msg.push_str(&o.conflicts[..limit].join("; "));
            }
            issues.push(Issue {
                severity: Severity::Error,
                category: IssueCategory::Conflict,
                message: msg,
                agents: vec![o.agent_a.clone(), o.agent_b.clone()],
                score: o.overlap_score,
            });
        } else if o.overlap_score > max_overlap {
            issues.push(Issue {
                severity: Severity::Warning,
                category: IssueCategory::Overlap,
                message: format_overlap_message(o),
                agents: vec![o.agent_a.clone(), o.agent_b.clone()],
                score: o.overlap_score,
            });
        }
    }

    for g in gaps {
        if g.verdict == GapVerdict::Uncovered {
            issues.push(Issue {
                severity: Severity::Warning,
                category: IssueCategory::Gap,
                message: format!("Domain '{}' has no agent with strong coverage", g.domain),
                agents: Vec::new(),
                score: g.closest_score,
            });
        }
    }

    for (agent_id, scores) in agent_scores {
        if !scores.has_boundary_language {
            issues.push(Issue {
                severity: Severity::Info,
                category: IssueCategory::Boundary,
                message: format!(
                    "Agent '{}' has no boundary/scope language in its definition — may confidently answer outside its domain",
                    agent_id
                ),
                agents: vec![agent_id.clone()],
                score: scores.boundary_def_score,
            });
        }
        if !scores.has_uncertainty_guidance {
            issues.push(Issue {
                severity: Severity::Info,
                category: IssueCategory::Uncertainty,
                message: format!(
                    "Agent '{}' has no uncertainty guidance — may not hedge when it should",
                    agent_id
                ),
                agents: vec![agent_id.clone()],
                score: scores.uncertainty_guid_score,
            });
        }
    }

    issues
}

fn format_overlap_message(o: &OverlapResult) -> String {
    let mut msg = format!(
        "High scope overlap ({}) between '{}' and '{}'",
        format_percent(o.overlap_score),
        o.agent_a,
        o.agent_b
    );
    if !o.shared_domains.is_empty() {
        msg.push_str(" on domains: ");
        msg.push_str(&o.shared_domains.join(", "));
    }
    msg
}

pub(crate) fn format_percent(f: f64) -> String {
    format!("{}%", (f * 100.0 + 0.5) as i64)
}

fn build_domain_summary(resolved: &BTreeMap<String, Vec<String>>) -> String {
    let builtin_count = resolved
        .keys()
        .filter(|name| builtin_domains().contains_key(*name))
        .count();
    let custom_count = resolved.len() - builtin_count;
    if custom_count == 0 {
        format!("{} built-in domains", builtin_count)
    } else {
        format!("{} built-in + {} custom domains", builtin_count, custom_count)
    }
}
