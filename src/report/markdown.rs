//! Markdown rendering for PR comments and probe transcripts.

use std::fmt::Write;

use crate::analysis::{Issue, OverlapResult, OverlapVerdict, Severity, StaticReport};
use crate::probes::LiveProbeReport;
use crate::report::terminal::strong_domain_names;

/// Renders a compact markdown summary suitable for a PR comment.
pub fn format_markdown(static_report: &StaticReport, live: Option<&LiveProbeReport>) -> String {
    let mut b = String::new();

    let overall = static_report.overall;
    let status = if overall >= 0.7 {
        "✅ Pass"
    } else if overall >= 0.5 {
        "⚠️ Warning"
    } else {
        "❌ Fail"
    };
    let _ = write!(b, "## agent-evals: {} ({:.0}%)\n\n", status, overall * 100.0);

    b.push_str("### Agents\n\n");
    if live.is_some() {
        b.push_str("| Agent | Domains | Boundary | Calibration | Refusal | Consistency |\n");
        b.push_str("|-------|---------|----------|-------------|---------|-------------|\n");
    } else {
        b.push_str("| Agent | Domains | Scope Clarity | Boundary Def | Uncertainty |\n");
        b.push_str("|-------|---------|---------------|--------------|-------------|\n");
    }

    for agent in &static_report.agents {
        let strong = strong_domain_names(static_report.domain_map.get(&agent.id));
        let domain_str = if strong.is_empty() {
            "—".to_string()
        } else {
            strong[..strong.len().min(3)].join(", ")
        };

        if let Some(live) = live {
            if let Some(lr) = live.agent_results.get(&agent.id) {
                let _ = writeln!(
                    b,
                    "| {} | {} | {:.0}% | {:.0}% | {:.0}% | {:.0}% |",
                    agent.id,
                    domain_str,
                    lr.boundary_score * 100.0,
                    lr.calibration_score * 100.0,
                    lr.refusal_health * 100.0,
                    lr.consistency_score * 100.0,
                );
            }
        } else {
            let scores = static_report.agent_scores.get(&agent.id).cloned().unwrap_or_default();
            let _ = writeln!(
                b,
                "| {} | {} | {:.0}% | {:.0}% | {:.0}% |",
                agent.id,
                domain_str,
                scores.scope_clarity_score * 100.0,
                scores.boundary_def_score * 100.0,
                scores.uncertainty_guid_score * 100.0,
            );
        }
    }
    b.push('\n');

    let mut significant: Vec<&OverlapResult> =
        static_report.overlaps.iter().filter(|o| o.overlap_score > 0.1).collect();
    if !significant.is_empty() {
        b.push_str("### Overlaps\n\n");
        significant.sort_by(|a, z| {
            z.overlap_score.partial_cmp(&a.overlap_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        for o in significant {
            let emoji = if o.verdict == OverlapVerdict::Conflict { "🔴" } else { "🟡" };
            let _ = writeln!(
                b,
                "- {} **{}** ↔ **{}**: {:.0}% ({})",
                emoji,
                o.agent_a,
                o.agent_b,
                o.overlap_score * 100.0,
                o.shared_domains.join(", "),
            );
        }
        b.push('\n');
    }

    let ordered: Vec<&Issue> = static_report
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .chain(static_report.issues.iter().filter(|i| i.severity == Severity::Warning))
        .collect();
    if !ordered.is_empty() {
        b.push_str("### Issues\n\n");
        for issue in ordered {
            let emoji = if issue.severity == Severity::Error { "❌" } else { "⚠️" };
            let _ = writeln!(b, "- {} {}", emoji, issue.message);
        }
        b.push('\n');
    }

    b
}

/// Renders every probe question and raw response as markdown, for manual
/// review of a live run.
pub fn format_transcript(live: &LiveProbeReport) -> String {
    let mut b = String::from("# Probe Transcript\n\n");

    for (agent_id, results) in &live.agent_results {
        if results.details.is_empty() {
            continue;
        }

        let _ = write!(b, "## {agent_id}\n\n");

        for (i, detail) in results.details.iter().enumerate() {
            let _ = write!(b, "### Probe {}: {} ({})\n\n", i + 1, detail.probe_id, detail.probe_type);
            let _ = write!(b, "**Domain:** {}\n\n", detail.domain);
            let _ = write!(b, "**Expected:** {}\n\n", detail.expected);
            let _ = write!(b, "**Question:** {}\n\n", detail.question);

            for resp in &detail.responses {
                let label = if resp.temperature > 0.0 {
                    format!("T={:.1}, run {}", resp.temperature, resp.run)
                } else {
                    "deterministic".to_string()
                };

                if let Some(err) = &resp.error {
                    let _ = write!(b, "#### Response ({label}) - ERROR\n\n```\n{err}\n```\n\n");
                    continue;
                }

                let conf = match resp.confidence {
                    Some(c) => format!("{c:.0}"),
                    None => "n/a".to_string(),
                };
                let _ = write!(b, "#### Response ({label})\n\n");
                let _ = writeln!(b, "- **Confidence:** {conf}");
                let _ = writeln!(b, "- **Hedging:** {:.2}", resp.hedging_score);
                let _ = write!(b, "- **Refusal:** {}\n\n", resp.is_refusal);
                let _ = write!(b, "```\n{}\n```\n\n", resp.raw);
            }

            b.push_str("---\n\n");
        }
    }

    let _ = writeln!(b, "*{} total API calls*", live.total_calls);
    b
}
