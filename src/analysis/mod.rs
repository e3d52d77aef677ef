//! Static analysis of agent definitions.
//!
//! Everything in this module is deterministic and offline:
//! - Domain extraction: keyword scoring of each agent against the
//!   built-in (or configured) domain vocabulary
//! - Overlap: pairwise scope comparison with conflict detection
//! - Gaps: domains no agent covers well
//! - Scoring: per-agent scope clarity, boundary and uncertainty signals
//! - Report: issue compilation and the overall score

mod domains;
mod gaps;
mod overlap;
mod report;
mod scoring;

pub use domains::{DomainScoreMap, DomainScores, builtin_domains, extract_domains, resolve_domains};
pub use gaps::{GapResult, GapVerdict, find_gaps};
pub use overlap::{OverlapResult, OverlapVerdict, compute_overlaps};
pub use report::{Issue, IssueCategory, Severity, StaticReport, run_static_analysis};
pub use scoring::{AgentScore, score_agent};

pub(crate) use domains::normalize_domain;
pub(crate) use report::format_percent;
