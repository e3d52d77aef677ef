//! Static analysis and live behavioral probing for LLM agent
//! configurations.
//!
//! Loads agent definitions from YAML, JSON, Markdown or plain text, scores
//! their domain coverage, pairwise overlap and boundary hygiene, and can
//! probe the live model behind each agent to measure how it behaves at the
//! edges of its scope.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod probes;
pub mod provider;
pub mod report;

pub use analysis::{StaticReport, run_static_analysis};
pub use config::EvalConfig;
pub use error::{EvalError, Result};
pub use loader::{AgentDefinition, load_agents, load_agents_recursive};
pub use probes::{LiveProbeReport, RunConfig, generate_probes, run_live_probes};
pub use provider::{ModelClient, ProviderConfig, new_client};
pub use report::{format_json, format_markdown, format_terminal, format_transcript};
