//! Coverage-gap analysis: domains no agent covers well.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analysis::domains::DomainScoreMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapVerdict {
    Uncovered,
    WeaklyCovered,
}

impl std::fmt::Display for GapVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uncovered => write!(f, "uncovered"),
            Self::WeaklyCovered => write!(f, "weakly_covered"),
        }
    }
}

/// A domain with insufficient agent coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapResult {
    pub domain: String,
    pub closest_agent: String,
    pub closest_score: f64,
    pub verdict: GapVerdict,
}

/// Finds domains with no strong agent coverage. Output is sorted by domain
/// name; the best-covering agent wins on a strictly-greater score, so ties
/// keep the first agent in iteration order.
pub fn find_gaps(all_domains: &BTreeSet<String>, domain_map: &DomainScoreMap) -> Vec<GapResult> {
    let mut gaps = Vec::new();

    for domain in all_domains {
        let mut best_agent = String::new();
        let mut best_score = 0.0_f64;

        for (agent_id, scores) in domain_map {
            let score = scores.get(domain).copied().unwrap_or(0.0);
            if score > best_score {
                best_score = score;
                best_agent = agent_id.clone();
            }
        }

        let verdict = if best_score < 0.2 {
            GapVerdict::Uncovered
        } else if best_score < 0.5 {
            GapVerdict::WeaklyCovered
        } else {
            continue;
        };

        gaps.push(GapResult {
            domain: domain.clone(),
            closest_agent: best_agent,
            closest_score: best_score,
            verdict,
        });
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domains::DomainScores;

    fn domain_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn map_with(agent: &str, domain: &str, score: f64) -> DomainScoreMap {
        let mut scores = DomainScores::new();
        scores.insert(domain.to_string(), score);
        let mut map = DomainScoreMap::new();
        map.insert(agent.to_string(), scores);
        map
    }

    #[test]
    fn threshold_boundaries_are_exact() {
        let domains = domain_set(&["d"]);

        let gaps = find_gaps(&domains, &map_with("a", "d", 0.19));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].verdict, GapVerdict::Uncovered);

        let gaps = find_gaps(&domains, &map_with("a", "d", 0.2));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].verdict, GapVerdict::WeaklyCovered);

        let gaps = find_gaps(&domains, &map_with("a", "d", 0.49));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].verdict, GapVerdict::WeaklyCovered);

        let gaps = find_gaps(&domains, &map_with("a", "d", 0.5));
        assert!(gaps.is_empty());
    }

    #[test]
    fn best_covering_agent_is_reported() {
        let mut map = DomainScoreMap::new();
        let mut weak = DomainScores::new();
        weak.insert("storage".into(), 0.1);
        map.insert("generalist".into(), weak);
        let mut better = DomainScores::new();
        better.insert("storage".into(), 0.35);
        map.insert("db_helper".into(), better);

        let gaps = find_gaps(&domain_set(&["storage"]), &map);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].closest_agent, "db_helper");
        assert_eq!(gaps[0].closest_score, 0.35);
        assert_eq!(gaps[0].verdict, GapVerdict::WeaklyCovered);
    }

    #[test]
    fn output_is_sorted_by_domain() {
        let map = DomainScoreMap::new();
        let gaps = find_gaps(&domain_set(&["zeta", "alpha", "mid"]), &map);
        let names: Vec<_> = gaps.iter().map(|g| g.domain.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn no_agents_means_everything_uncovered() {
        let map = DomainScoreMap::new();
        let gaps = find_gaps(&domain_set(&["a", "b"]), &map);
        assert_eq!(gaps.len(), 2);
        for gap in &gaps {
            assert_eq!(gap.verdict, GapVerdict::Uncovered);
            assert_eq!(gap.closest_agent, "");
            assert_eq!(gap.closest_score, 0.0);
        }
    }

    #[test]
    fn covered_domains_are_not_gaps() {
        let gaps = find_gaps(&domain_set(&["d"]), &map_with("a", "d", 0.9));
        assert!(gaps.is_empty());
    }
}
