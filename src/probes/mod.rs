//! Live behavioral probing.
//!
//! Turns static analysis context into concrete API calls:
//! - Questions: probe generation from the domain question bank
//! - Runner: bounded-concurrency execution against a model provider
//! - Parser: confidence / hedging / refusal extraction from raw responses
//! - Scoring: per-agent behavioral scores over the stochastic runs

mod parser;
mod questions;
mod runner;
mod scoring;

pub use parser::{ParsedResponse, parse_probe_response};
pub use questions::{BOUNDARY_PROBE_TEMPLATE, ProbeQuestion, ProbeType, generate_probes};
pub use runner::{LiveProbeReport, ProgressCallback, RunConfig, run_live_probes};
pub use scoring::{AgentProbeResults, ProbeDetail, ResponseRecord, score_agent_probes};
