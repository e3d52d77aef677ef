//! Machine-readable JSON report for CI artifacts.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::analysis::StaticReport;
use crate::probes::LiveProbeReport;

/// Renders the full report as pretty-printed JSON.
pub fn format_json(static_report: &StaticReport, live: Option<&LiveProbeReport>) -> String {
    let mut report = json!({
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "version": env!("CARGO_PKG_VERSION"),
        "overall_score": static_report.overall,
        "pass": static_report.overall >= 0.7 && !static_report.has_failures(),
    });

    let mut agents = Vec::new();
    for agent in &static_report.agents {
        let scores = static_report.agent_scores.get(&agent.id).cloned().unwrap_or_default();
        let mut entry = json!({
            "id": &agent.id,
            "name": &agent.name,
            "source": &agent.source_path,
            "domains": static_report.domain_map.get(&agent.id),
            "static_scores": {
                "scope_clarity_score": scores.scope_clarity_score,
                "boundary_definition_score": scores.boundary_def_score,
                "uncertainty_guidance_score": scores.uncertainty_guid_score,
                "has_boundary_language": scores.has_boundary_language,
                "has_uncertainty_guidance": scores.has_uncertainty_guidance,
                "strong_domains": scores.strong_domains,
                "weak_domains": scores.weak_domains,
                "max_overlap_with_other": scores.max_overlap_with_other,
                "word_count": scores.word_count,
            },
        });

        if !agent.content_hash.is_empty() {
            entry["content_hash"] = json!(&agent.content_hash);
        }
        if !agent.also_found_in.is_empty() {
            entry["also_found_in"] = json!(&agent.also_found_in);
            entry["instance_count"] = json!(1 + agent.also_found_in.len());
        }

        if let Some(live) = live
            && let Some(lr) = live.agent_results.get(&agent.id)
        {
            entry["live_scores"] = json!({
                "boundary_score": lr.boundary_score,
                "calibration_score": lr.calibration_score,
                "refusal_health": lr.refusal_health,
                "consistency_score": lr.consistency_score,
                "probes_run": lr.probes_run,
            });
        }

        agents.push(entry);
    }
    report["agents"] = Value::Array(agents);

    let overlaps: Vec<Value> = static_report
        .overlaps
        .iter()
        .filter(|o| o.overlap_score > 0.1)
        .map(|o| {
            json!({
                "agents": [&o.agent_a, &o.agent_b],
                "score": round3(o.overlap_score),
                "shared_domains": &o.shared_domains,
                "conflicts": &o.conflicts,
                "verdict": o.verdict,
            })
        })
        .collect();
    report["overlaps"] = Value::Array(overlaps);

    let gaps: Vec<Value> = static_report
        .gaps
        .iter()
        .map(|g| {
            json!({
                "domain": &g.domain,
                "verdict": g.verdict,
                "closest_agent": &g.closest_agent,
                "closest_score": round3(g.closest_score),
            })
        })
        .collect();
    report["gaps"] = Value::Array(gaps);

    let issues: Vec<Value> = static_report
        .issues
        .iter()
        .map(|i| {
            json!({
                "severity": i.severity,
                "category": i.category,
                "message": &i.message,
                "agents": &i.agents,
                "score": i.score,
            })
        })
        .collect();
    report["issues"] = Value::Array(issues);

    if let Some(live) = live {
        let probed = live.agent_results.values().filter(|r| r.probes_run > 0).count();
        report["live_summary"] = json!({
            "total_api_calls": live.total_calls,
            "agents_probed": probed,
        });
    }

    // Present only when the recursive loader collapsed duplicates.
    let total_files: usize =
        static_report.agents.iter().map(|a| 1 + a.also_found_in.len()).sum();
    let duplicates_collapsed: usize =
        static_report.agents.iter().map(|a| a.also_found_in.len()).sum();
    if duplicates_collapsed > 0 {
        report["scan_metadata"] = json!({
            "total_files_scanned": total_files,
            "unique_agents": static_report.agents.len(),
            "duplicates_collapsed": duplicates_collapsed,
            "dedup_method": "sha256-system-prompt",
        });
    }

    serde_json::to_string_pretty(&report)
        .unwrap_or_else(|e| format!(r#"{{"error": "failed to serialize report: {e}"}}"#))
}

fn round3(f: f64) -> f64 {
    ((f * 1000.0 + 0.5) as i64) as f64 / 1000.0
}
