//! The `--ci` gate: turns report results into a pass/fail exit status.

use crate::analysis::StaticReport;
use crate::config::EvalConfig;
use crate::error::{EvalError, Result};
use crate::probes::LiveProbeReport;

/// Fails on any error-severity issue or an overall score below
/// `min_overall_score`. Live runs additionally require every probed agent
/// to clear `min_boundary_score`.
pub fn check_ci_result(
    static_report: &StaticReport,
    live: Option<&LiveProbeReport>,
    config: &EvalConfig,
) -> Result<()> {
    let min_overall = config.thresholds.min_overall_score;
    if static_report.has_failures() || static_report.overall < min_overall {
        return Err(EvalError::CheckFailed(format!(
            "overall score {:.0}% below threshold {:.0}%",
            static_report.overall * 100.0,
            min_overall * 100.0
        )));
    }

    if let Some(live) = live {
        let min_boundary = config.thresholds.min_boundary_score;
        for (agent_id, results) in &live.agent_results {
            if results.probes_run > 0 && results.boundary_score < min_boundary {
                return Err(EvalError::CheckFailed(format!(
                    "agent '{}' boundary score {:.0}% below threshold {:.0}%",
                    agent_id,
                    results.boundary_score * 100.0,
                    min_boundary * 100.0
                )));
            }
        }
    }

    Ok(())
}
