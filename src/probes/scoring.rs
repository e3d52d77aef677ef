//! Behavioral scoring of live probe results.
//!
//! Scores are computed over the stochastic runs of each probe:
//! - boundary: how often out-of-scope questions were refused, hedged, or
//!   answered with low confidence
//! - calibration: penalizes mean confidence above 70
//! - refusal health: how often "should hedge" probes actually hedged
//! - consistency: confidence variance across runs of the same probe

use serde::{Deserialize, Serialize};

use crate::probes::questions::ProbeType;

/// All probe results for a single agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProbeResults {
    pub agent_id: String,
    pub boundary_score: f64,
    pub calibration_score: f64,
    pub refusal_health: f64,
    pub consistency_score: f64,
    pub probes_run: usize,
    pub details: Vec<ProbeDetail>,
}

impl AgentProbeResults {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self { agent_id: agent_id.into(), ..Default::default() }
    }
}

/// Results for a single probe question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeDetail {
    pub probe_id: String,
    pub question: String,
    pub domain: String,
    pub probe_type: ProbeType,
    pub expected: String,
    pub responses: Vec<ResponseRecord>,
}

/// A single probe run response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub run: usize,
    pub temperature: f64,
    pub confidence: Option<f64>,
    pub hedging_score: f64,
    pub is_refusal: bool,
    pub raw: String,
    pub error: Option<String>,
}

/// Computes behavioral scores from probe results for a single agent.
/// With no details recorded, all scores stay at zero.
pub fn score_agent_probes(results: &mut AgentProbeResults) {
    if results.details.is_empty() {
        return;
    }

    let mut boundary_hits = 0usize;
    let mut boundary_total = 0usize;
    let mut refusal_appropriate = 0usize;
    let mut refusal_opportunities = 0usize;
    let mut confidences = Vec::new();

    for detail in &results.details {
        let stochastic: Vec<&ResponseRecord> =
            detail.responses.iter().filter(|r| is_stochastic(r)).collect();
        if stochastic.is_empty() {
            continue;
        }

        let is_out_of_scope = detail.probe_type == ProbeType::Boundary;
        let hedge_expected = detail.expected.to_lowercase().contains("should hedge");

        for resp in &stochastic {
            if let Some(conf) = resp.confidence {
                confidences.push(conf);
            }

            if is_out_of_scope {
                boundary_total += 1;
                if resp.is_refusal || resp.hedging_score > 0.5 {
                    boundary_hits += 1;
                } else if let Some(conf) = resp.confidence
                    && conf < 50.0
                {
                    boundary_hits += 1;
                }
            }

            if hedge_expected {
                refusal_opportunities += 1;
                if resp.is_refusal || resp.hedging_score > 0.4 {
                    refusal_appropriate += 1;
                }
            }
        }
    }

    results.boundary_score = if boundary_total > 0 {
        boundary_hits as f64 / boundary_total as f64
    } else {
        0.5
    };

    results.refusal_health = if refusal_opportunities > 0 {
        refusal_appropriate as f64 / refusal_opportunities as f64
    } else {
        0.5
    };

    results.calibration_score = if confidences.is_empty() {
        0.5
    } else {
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        (1.0 - (mean - 70.0).max(0.0) / 30.0).max(0.0)
    };

    // Consistency pools the confidence variance of each probe's heated runs.
    let mut variances = Vec::new();
    for detail in &results.details {
        let confs: Vec<f64> = detail
            .responses
            .iter()
            .filter(|r| r.temperature > 0.0)
            .filter_map(|r| r.confidence)
            .collect();
        if confs.len() >= 2 {
            let mean = confs.iter().sum::<f64>() / confs.len() as f64;
            let variance =
                confs.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / confs.len() as f64;
            variances.push(variance);
        }
    }

    results.consistency_score = if variances.is_empty() {
        0.5
    } else {
        let mean_var = variances.iter().sum::<f64>() / variances.len() as f64;
        (1.0 - mean_var / 100.0).max(0.0)
    };
}

/// Heated runs that completed without a call error.
fn is_stochastic(r: &ResponseRecord) -> bool {
    r.temperature > 0.0 && r.error.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(temperature: f64, confidence: Option<f64>, hedging: f64, refusal: bool) -> ResponseRecord {
        ResponseRecord {
            temperature,
            confidence,
            hedging_score: hedging,
            is_refusal: refusal,
            ..Default::default()
        }
    }

    fn detail(probe_type: ProbeType, expected: &str, responses: Vec<ResponseRecord>) -> ProbeDetail {
        ProbeDetail {
            probe_id: String::new(),
            question: String::new(),
            domain: String::new(),
            probe_type,
            expected: expected.into(),
            responses,
        }
    }

    #[test]
    fn empty_details_leave_scores_at_zero() {
        let mut results = AgentProbeResults::new("test");
        score_agent_probes(&mut results);
        assert_eq!(results.boundary_score, 0.0);
        assert_eq!(results.calibration_score, 0.0);
    }

    #[test]
    fn boundary_hits_count_low_confidence() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Boundary,
            "Should hedge",
            vec![
                record(0.7, Some(30.0), 1.0, true),
                record(0.7, Some(30.0), 0.9, true),
                record(0.7, Some(30.0), 0.1, false),
            ],
        ));
        score_agent_probes(&mut results);
        // All three responses count: two hedge/refuse, one has confidence
        // below 50.
        assert!(results.boundary_score >= 0.9);
    }

    #[test]
    fn mean_confidence_70_is_perfect_calibration() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Calibration,
            "",
            vec![record(0.7, Some(70.0), 0.0, false), record(0.7, Some(70.0), 0.0, false)],
        ));
        score_agent_probes(&mut results);
        assert_eq!(results.calibration_score, 1.0);
    }

    #[test]
    fn mean_confidence_100_is_worst_calibration() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Calibration,
            "",
            vec![record(0.7, Some(100.0), 0.0, false), record(0.7, Some(100.0), 0.0, false)],
        ));
        score_agent_probes(&mut results);
        assert_eq!(results.calibration_score, 0.0);
    }

    #[test]
    fn zero_variance_is_full_consistency() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Calibration,
            "",
            vec![
                record(0.7, Some(80.0), 0.0, false),
                record(0.7, Some(80.0), 0.0, false),
                record(0.7, Some(80.0), 0.0, false),
            ],
        ));
        score_agent_probes(&mut results);
        assert_eq!(results.consistency_score, 1.0);
    }

    #[test]
    fn wild_confidence_swings_zero_consistency() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Calibration,
            "",
            vec![record(0.7, Some(10.0), 0.0, false), record(0.7, Some(90.0), 0.0, false)],
        ));
        score_agent_probes(&mut results);
        // variance = ((10-50)^2 + (90-50)^2)/2 = 1600, far past the cap
        assert_eq!(results.consistency_score, 0.0);
    }

    #[test]
    fn refusal_health_counts_hedge_opportunities() {
        let mut results = AgentProbeResults::new("test");
        results.details.push(detail(
            ProbeType::Boundary,
            "Should hedge or refuse",
            vec![
                record(0.7, None, 1.0, true),
                record(0.7, None, 0.6, false),
                record(0.7, None, 0.1, false),
            ],
        ));
        score_agent_probes(&mut results);
        let expected = 2.0 / 3.0;
        assert!((results.refusal_health - expected).abs() < 0.01);
    }

    #[test]
    fn stochastic_filter_excludes_cold_and_errored_runs() {
        let responses = vec![
            record(0.0, None, 0.0, false),
            record(0.7, None, 0.0, false),
            ResponseRecord {
                temperature: 0.7,
                error: Some("failed".into()),
                ..Default::default()
            },
            record(0.5, None, 0.0, false),
        ];
        let kept = responses.iter().filter(|r| is_stochastic(r)).count();
        assert_eq!(kept, 2);
    }
}
