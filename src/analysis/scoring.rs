//! Per-agent heuristic quality scores derived from static signals.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::domains::DomainScoreMap;
use crate::analysis::overlap::OverlapResult;
use crate::loader::AgentDefinition;

/// Summary scores for a single agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentScore {
    pub strong_domains: Vec<String>,
    pub weak_domains: Vec<String>,
    pub max_overlap_with_other: f64,
    pub has_boundary_language: bool,
    pub has_uncertainty_guidance: bool,
    pub scope_clarity_score: f64,
    pub boundary_def_score: f64,
    pub uncertainty_guid_score: f64,
    pub word_count: usize,
}

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(don't|do not|avoid|outside|beyond|limit|scope|boundary|refer to)").unwrap()
    })
}

fn uncertainty_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(uncertain|unsure|don't know|not sure|hedge|caveat|confidence)").unwrap()
    })
}

/// Computes summary scores for a single agent. Strong domains score above
/// 0.5; weak domains sit in (0.2, 0.5].
pub fn score_agent(
    agent: &AgentDefinition,
    domain_map: &DomainScoreMap,
    overlaps: &[OverlapResult],
) -> AgentScore {
    let mut strong = Vec::new();
    let mut weak = Vec::new();
    if let Some(domains) = domain_map.get(&agent.id) {
        for (domain, score) in domains {
            if *score > 0.5 {
                strong.push(domain.clone());
            } else if *score > 0.2 {
                weak.push(domain.clone());
            }
        }
    }

    let max_overlap = overlaps
        .iter()
        .filter(|o| o.involves(&agent.id))
        .map(|o| o.overlap_score)
        .fold(0.0_f64, f64::max);

    let prompt = agent.system_prompt.to_lowercase();
    let has_boundary = boundary_re().is_match(&prompt);
    let has_uncertainty = uncertainty_re().is_match(&prompt);

    // Three strong domains is treated as a fully clear scope; none at all
    // gets a floor of 0.2 rather than zero.
    let scope_score = if strong.is_empty() {
        0.2
    } else {
        (strong.len() as f64 / 3.0).min(1.0)
    };

    AgentScore {
        strong_domains: strong,
        weak_domains: weak,
        max_overlap_with_other: max_overlap,
        has_boundary_language: has_boundary,
        has_uncertainty_guidance: has_uncertainty,
        scope_clarity_score: scope_score,
        boundary_def_score: if has_boundary { 0.7 } else { 0.3 },
        uncertainty_guid_score: if has_uncertainty { 0.8 } else { 0.3 },
        word_count: agent.word_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domains::DomainScores;
    use crate::analysis::overlap::OverlapVerdict;

    fn agent(id: &str, prompt: &str) -> AgentDefinition {
        AgentDefinition {
            id: id.into(),
            name: id.into(),
            system_prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn map_for(id: &str, pairs: &[(&str, f64)]) -> DomainScoreMap {
        let scores: DomainScores = pairs.iter().map(|(d, s)| (d.to_string(), *s)).collect();
        let mut map = DomainScoreMap::new();
        map.insert(id.to_string(), scores);
        map
    }

    #[test]
    fn boundary_language_is_detected() {
        for prompt in [
            "Don't answer questions outside your scope.",
            "Avoid topics beyond your expertise.",
            "Stay within the limit of backend work; refer to the docs team otherwise.",
        ] {
            let score = score_agent(&agent("a", prompt), &DomainScoreMap::new(), &[]);
            assert!(score.has_boundary_language, "prompt: {prompt}");
            assert_eq!(score.boundary_def_score, 0.7);
        }
    }

    #[test]
    fn missing_boundary_language_scores_low() {
        let score = score_agent(
            &agent("a", "You answer every question enthusiastically."),
            &DomainScoreMap::new(),
            &[],
        );
        assert!(!score.has_boundary_language);
        assert_eq!(score.boundary_def_score, 0.3);
    }

    #[test]
    fn uncertainty_guidance_is_detected() {
        for prompt in [
            "Say 'I'm not sure' when you are uncertain.",
            "Always hedge when evidence is thin.",
            "State your confidence with each answer.",
        ] {
            let score = score_agent(&agent("a", prompt), &DomainScoreMap::new(), &[]);
            assert!(score.has_uncertainty_guidance, "prompt: {prompt}");
            assert_eq!(score.uncertainty_guid_score, 0.8);
        }
    }

    #[test]
    fn scope_clarity_scales_with_strong_domains() {
        let map = map_for("a", &[("one", 0.9), ("two", 0.8)]);
        let score = score_agent(&agent("a", "p"), &map, &[]);
        assert!((score.scope_clarity_score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.strong_domains.len(), 2);
        assert!(score.weak_domains.is_empty());

        let map = map_for(
            "a",
            &[("a", 0.9), ("b", 0.9), ("c", 0.9), ("d", 0.9), ("e", 0.9)],
        );
        let score = score_agent(&agent("a", "p"), &map, &[]);
        assert_eq!(score.scope_clarity_score, 1.0);
    }

    #[test]
    fn no_strong_domains_gets_clarity_floor() {
        let map = map_for("a", &[("faint", 0.1)]);
        let score = score_agent(&agent("a", "p"), &map, &[]);
        assert_eq!(score.scope_clarity_score, 0.2);
        assert!(score.strong_domains.is_empty());
    }

    #[test]
    fn weak_domain_band_is_half_open() {
        let map = map_for("a", &[("at_low", 0.2), ("in_band", 0.21), ("at_high", 0.5)]);
        let score = score_agent(&agent("a", "p"), &map, &[]);
        assert!(!score.weak_domains.contains(&"at_low".to_string()));
        assert!(score.weak_domains.contains(&"in_band".to_string()));
        assert!(score.weak_domains.contains(&"at_high".to_string()));
        assert!(score.strong_domains.is_empty());
    }

    #[test]
    fn max_overlap_considers_only_own_pairs() {
        let overlaps = vec![
            OverlapResult {
                agent_a: "a".into(),
                agent_b: "b".into(),
                shared_domains: vec![],
                overlap_score: 0.7,
                prompt_similarity: 0.0,
                conflicts: vec![],
                verdict: OverlapVerdict::Warning,
            },
            OverlapResult {
                agent_a: "b".into(),
                agent_b: "c".into(),
                shared_domains: vec![],
                overlap_score: 0.9,
                prompt_similarity: 0.0,
                conflicts: vec![],
                verdict: OverlapVerdict::Warning,
            },
        ];
        let score = score_agent(&agent("a", "p"), &DomainScoreMap::new(), &overlaps);
        assert_eq!(score.max_overlap_with_other, 0.7);
    }

    #[test]
    fn word_count_comes_from_full_context() {
        let mut a = agent("a", "one two three");
        a.skills = vec!["four five".into()];
        let score = score_agent(&a, &DomainScoreMap::new(), &[]);
        assert_eq!(score.word_count, a.word_count());
    }
}
