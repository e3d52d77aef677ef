//! Human-readable terminal report with a muted 256-color palette.

use std::fmt::Write;

use console::Style;

use crate::analysis::{DomainScores, GapVerdict, Severity, StaticReport};
use crate::probes::LiveProbeReport;

const RULER: &str = "────────────────────────────────────────────────────────";

const BAR_WIDTH: usize = 16;

// Muted tones via 256-color.
fn rose() -> Style {
    Style::new().color256(174)
}

fn amber() -> Style {
    Style::new().color256(179)
}

fn sage() -> Style {
    Style::new().color256(108)
}

fn slate() -> Style {
    Style::new().color256(110)
}

fn stone() -> Style {
    Style::new().color256(245)
}

fn chalk() -> Style {
    Style::new().color256(188)
}

fn section_header(b: &mut String, title: &str) {
    let _ = writeln!(b);
    let _ = writeln!(b, "  {}", chalk().bold().apply_to(title.to_uppercase()));
    let _ = writeln!(b, "  {}", stone().apply_to(RULER));
}

/// Renders the full report for terminal display.
pub fn format_terminal(static_report: &StaticReport, live: Option<&LiveProbeReport>) -> String {
    let mut b = String::new();

    let _ = writeln!(b);
    let _ = writeln!(b, "  {}", chalk().bold().apply_to("agent-evals report"));
    let _ = writeln!(b, "  {}", stone().apply_to(RULER));

    section_header(&mut b, &format!("Agents ({})", static_report.agents.len()));

    for (i, agent) in static_report.agents.iter().enumerate() {
        let strong = strong_domain_names(static_report.domain_map.get(&agent.id));
        let scores = static_report.agent_scores.get(&agent.id).cloned().unwrap_or_default();

        let domain_str = if strong.is_empty() {
            stone().apply_to("(none detected)").to_string()
        } else {
            let sep = stone().apply_to(", ").to_string();
            strong
                .iter()
                .map(|d| slate().apply_to(d.as_str()).to_string())
                .collect::<Vec<_>>()
                .join(&sep)
        };

        let _ = writeln!(b, "  {}", chalk().apply_to(agent.id.as_str()));
        let _ = writeln!(b, "    {}   {}", stone().apply_to("domains"), domain_str);

        if !scores.has_boundary_language {
            let _ = writeln!(b, "    {}", amber().apply_to("⚠  no boundary/scope language"));
        }
        if !scores.has_uncertainty_guidance {
            let _ = writeln!(b, "    {}", amber().apply_to("⚠  no uncertainty/hedging guidance"));
        }

        if i < static_report.agents.len() - 1 {
            let _ = writeln!(b);
        }
    }

    if static_report.overlaps.iter().any(|o| o.overlap_score > 0.1) {
        section_header(&mut b, "Scope Overlap");

        let mut sorted: Vec<_> = static_report.overlaps.iter().collect();
        sorted.sort_by(|a, z| {
            z.overlap_score.partial_cmp(&a.overlap_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        for o in sorted {
            if o.overlap_score <= 0.1 {
                continue;
            }
            let pct = overlap_style(o.overlap_score);
            let _ = writeln!(
                b,
                "  {}  {:<20}  {}  {:<20} {}   {}",
                pct.apply_to("●"),
                o.agent_a,
                stone().apply_to("◄──►"),
                o.agent_b,
                pct.apply_to(format!("{:3.0}%", o.overlap_score * 100.0)),
                stone().apply_to(o.shared_domains.join(", ")),
            );
            for c in o.conflicts.iter().take(2) {
                let _ = writeln!(b, "        {}", rose().apply_to(format!("✘  {c}")));
            }
        }
    }

    if !static_report.gaps.is_empty() {
        section_header(&mut b, "Coverage Gaps");

        for g in &static_report.gaps {
            let (dot, verdict_style) = if g.verdict == GapVerdict::Uncovered {
                (rose().apply_to("●"), rose())
            } else {
                (amber().apply_to("●"), amber())
            };
            let closest = if g.closest_agent.is_empty() { "none" } else { g.closest_agent.as_str() };
            let _ = writeln!(
                b,
                "  {}  {:<24} {} {}",
                dot,
                g.domain,
                verdict_style.apply_to(format!("{:<18}", g.verdict)),
                stone().apply_to(format!("closest: {} ({:.0}%)", closest, g.closest_score * 100.0)),
            );
        }
    }

    if let Some(live) = live {
        section_header(&mut b, "Live Probe Results");

        for (agent_id, results) in &live.agent_results {
            if results.probes_run == 0 {
                continue;
            }
            let _ = writeln!(
                b,
                "  {}  {}",
                chalk().apply_to(agent_id.as_str()),
                stone().apply_to(format!("({} probes)", results.probes_run)),
            );
            let _ = writeln!(
                b,
                "    {}    {}  {:3.0}%",
                stone().apply_to("boundary"),
                color_bar(results.boundary_score),
                results.boundary_score * 100.0,
            );
            let _ = writeln!(
                b,
                "    {} {}  {:3.0}%",
                stone().apply_to("calibration"),
                color_bar(results.calibration_score),
                results.calibration_score * 100.0,
            );
            let _ = writeln!(
                b,
                "    {}     {}  {:3.0}%",
                stone().apply_to("refusal"),
                color_bar(results.refusal_health),
                results.refusal_health * 100.0,
            );
            let _ = writeln!(
                b,
                "    {} {}  {:3.0}%",
                stone().apply_to("consistency"),
                color_bar(results.consistency_score),
                results.consistency_score * 100.0,
            );
            let _ = writeln!(b);
        }
        let _ =
            writeln!(b, "  {}", stone().apply_to(format!("total api calls: {}", live.total_calls)));
    }

    if !static_report.issues.is_empty() {
        section_header(&mut b, "Issues");

        for issue in &static_report.issues {
            let (icon, label_style, label) = match issue.severity {
                Severity::Error => (rose().apply_to("✘"), rose(), "ERR "),
                Severity::Warning => (amber().apply_to("⚠"), amber(), "WARN"),
                Severity::Info => (slate().apply_to("ⓘ"), slate(), "INFO"),
            };
            let prefix = format!("  {}  {}  ", icon, label_style.apply_to(label));
            for (i, line) in word_wrap(&issue.message, 69).iter().enumerate() {
                if i == 0 {
                    let _ = writeln!(b, "{prefix}{line}");
                } else {
                    let _ = writeln!(b, "{}{line}", " ".repeat(11));
                }
            }
        }
    }

    let overall = adjusted_overall(static_report, live);
    let (status_label, status_style) = if overall >= 0.7 {
        ("PASS ✔", sage())
    } else if overall >= 0.5 {
        ("WARN ⚠", amber())
    } else {
        ("FAIL ✘", rose())
    };

    let _ = writeln!(b);
    let _ = writeln!(b, "  {}", stone().apply_to(RULER));
    let _ = writeln!(
        b,
        "  {}   {}  {}   {}",
        chalk().bold().apply_to("Overall"),
        color_bar(overall),
        chalk().apply_to(format!("{:3.0}%", overall * 100.0)),
        status_style.apply_to(status_label),
    );
    let _ = writeln!(b);

    b
}

/// The static overall score, averaged with the mean live boundary score
/// when any agent was actually probed.
pub fn adjusted_overall(static_report: &StaticReport, live: Option<&LiveProbeReport>) -> f64 {
    let overall = static_report.overall;
    let Some(live) = live else {
        return overall;
    };
    let boundary: Vec<f64> = live
        .agent_results
        .values()
        .filter(|r| r.probes_run > 0)
        .map(|r| r.boundary_score)
        .collect();
    if boundary.is_empty() {
        return overall;
    }
    let live_avg = boundary.iter().sum::<f64>() / boundary.len() as f64;
    (overall + live_avg) / 2.0
}

/// Gradient from cool (low overlap) to warning (high overlap).
fn overlap_style(score: f64) -> Style {
    if score >= 0.6 {
        rose()
    } else if score >= 0.45 {
        Style::new().color256(173)
    } else if score >= 0.35 {
        amber()
    } else if score >= 0.25 {
        Style::new().color256(144)
    } else {
        Style::new().color256(109)
    }
}

fn color_bar(score: f64) -> String {
    let filled = ((score * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);

    let fill_style = if score >= 0.7 {
        sage()
    } else if score >= 0.5 {
        amber()
    } else {
        rose()
    };

    format!(
        "{}{}",
        fill_style.apply_to("█".repeat(filled)),
        stone().apply_to("░".repeat(BAR_WIDTH - filled)),
    )
}

/// Breaks text into lines of at most `max_width` bytes, splitting at word
/// boundaries.
pub(crate) fn word_wrap(text: &str, max_width: usize) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return vec![String::new()];
    };

    let mut lines = Vec::new();
    let mut line = first.to_string();
    for w in words {
        if line.len() + 1 + w.len() > max_width {
            lines.push(line);
            line = w.to_string();
        } else {
            line.push(' ');
            line.push_str(w);
        }
    }
    lines.push(line);
    lines
}

/// Domain names scoring above 0.5, in name order.
pub(crate) fn strong_domain_names(domains: Option<&DomainScores>) -> Vec<String> {
    let Some(domains) = domains else {
        return Vec::new();
    };
    domains.iter().filter(|(_, s)| **s > 0.5).map(|(d, _)| d.clone()).collect()
}
