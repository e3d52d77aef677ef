//! Pairwise scope overlap and conflicting-instruction detection.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::domains::{DomainScoreMap, DomainScores};
use crate::loader::AgentDefinition;

/// Extraction score above which a domain counts toward overlap computation.
/// Deliberately lower than the 0.5 used for agent-level strong-domain lists.
const OVERLAP_STRONG_THRESHOLD: f64 = 0.3;

/// Prompts are truncated to this many bytes before similarity scoring.
const SIMILARITY_WINDOW: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapVerdict {
    Clean,
    Warning,
    Conflict,
}

impl std::fmt::Display for OverlapVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Warning => write!(f, "warning"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Comparison of one unordered agent pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapResult {
    pub agent_a: String,
    pub agent_b: String,
    pub shared_domains: Vec<String>,
    pub overlap_score: f64,
    pub prompt_similarity: f64,
    pub conflicts: Vec<String>,
    pub verdict: OverlapVerdict,
}

impl OverlapResult {
    pub fn involves(&self, agent_id: &str) -> bool {
        self.agent_a == agent_id || self.agent_b == agent_id
    }
}

/// Compares every unordered pair of agents.
pub fn compute_overlaps(agents: &[AgentDefinition], domain_map: &DomainScoreMap) -> Vec<OverlapResult> {
    let empty = DomainScores::new();
    let mut results = Vec::new();
    for i in 0..agents.len() {
        for j in (i + 1)..agents.len() {
            let scores_a = domain_map.get(&agents[i].id).unwrap_or(&empty);
            let scores_b = domain_map.get(&agents[j].id).unwrap_or(&empty);
            results.push(compute_overlap(&agents[i], &agents[j], scores_a, scores_b));
        }
    }
    results
}

fn compute_overlap(
    a: &AgentDefinition,
    b: &AgentDefinition,
    scores_a: &DomainScores,
    scores_b: &DomainScores,
) -> OverlapResult {
    let strong_a = strong_domains(scores_a, OVERLAP_STRONG_THRESHOLD);
    let strong_b = strong_domains(scores_b, OVERLAP_STRONG_THRESHOLD);

    let shared: Vec<String> = strong_a.intersection(&strong_b).cloned().collect();
    let union_size = strong_a.union(&strong_b).count();
    let overlap_score = if union_size == 0 {
        0.0
    } else {
        shared.len() as f64 / union_size as f64
    };

    let prompt_similarity = similarity(
        &truncated_lower(&a.system_prompt),
        &truncated_lower(&b.system_prompt),
    );

    let conflicts = detect_conflicts(a, b);

    let verdict = if !conflicts.is_empty() {
        OverlapVerdict::Conflict
    } else if overlap_score > 0.5 {
        OverlapVerdict::Warning
    } else {
        OverlapVerdict::Clean
    };

    OverlapResult {
        agent_a: a.id.clone(),
        agent_b: b.id.clone(),
        shared_domains: shared,
        overlap_score,
        prompt_similarity,
        conflicts,
        verdict,
    }
}

pub(crate) fn strong_domains(scores: &DomainScores, threshold: f64) -> BTreeSet<String> {
    scores
        .iter()
        .filter(|(_, score)| **score > threshold)
        .map(|(domain, _)| domain.clone())
        .collect()
}

fn truncated_lower(prompt: &str) -> Vec<u8> {
    let lower = prompt.to_lowercase();
    let bytes = lower.as_bytes();
    bytes[..bytes.len().min(SIMILARITY_WINDOW)].to_vec()
}

/// Textual similarity in [0, 1] via longest common subsequence:
/// `2*LCS / (len(a)+len(b))`. Both inputs empty is defined as identical.
pub(crate) fn similarity(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(a, b);
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

// Two-row dynamic program; prompts are capped at SIMILARITY_WINDOW so the
// table stays small.
fn lcs_length(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

struct OppositionPair {
    positive: Regex,
    negative_template: &'static str,
}

/// Positive-instruction captures and the negative pattern that contradicts
/// them; `%s` is replaced with the escaped captured token.
fn opposition_pairs() -> &'static Vec<OppositionPair> {
    static PAIRS: OnceLock<Vec<OppositionPair>> = OnceLock::new();
    PAIRS.get_or_init(|| {
        [
            (r"always use (\w+)", r"(?:never|avoid|don't) use %s"),
            (r"prefer (\w+)", r"(?:avoid|don't use|never) %s"),
            (r"must (?:always )?(\w+)", r"(?:must not|should not|never) %s"),
            (r"use (\w+) for", r"(?:don't|never|avoid) (?:using )?%s for"),
        ]
        .into_iter()
        .map(|(positive, negative_template)| OppositionPair {
            positive: Regex::new(positive).unwrap(),
            negative_template,
        })
        .collect()
    })
}

/// Scans both agents' full texts for contradictory instructions, in both
/// directions, deduplicating by message.
fn detect_conflicts(a: &AgentDefinition, b: &AgentDefinition) -> Vec<String> {
    let text_a = a.full_context().to_lowercase();
    let text_b = b.full_context().to_lowercase();

    let mut conflicts = Vec::new();
    let mut seen = HashSet::new();

    scan_direction(&a.id, &text_a, &b.id, &text_b, &mut conflicts, &mut seen);
    scan_direction(&b.id, &text_b, &a.id, &text_a, &mut conflicts, &mut seen);

    conflicts
}

fn scan_direction(
    src_id: &str,
    src_text: &str,
    dst_id: &str,
    dst_text: &str,
    conflicts: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    for pair in opposition_pairs() {
        for caps in pair.positive.captures_iter(src_text) {
            let Some(token) = caps.get(1) else { continue };
            let pattern = pair
                .negative_template
                .replace("%s", &regex::escape(token.as_str()));
            let Ok(negative) = Regex::new(&pattern) else {
                continue;
            };
            if negative.is_match(dst_text) {
                let msg = format!(
                    "'{}' says use '{}' but '{}' says avoid it",
                    src_id,
                    token.as_str(),
                    dst_id
                );
                if seen.insert(msg.clone()) {
                    conflicts.push(msg);
                }
            }
        }
    }
}
