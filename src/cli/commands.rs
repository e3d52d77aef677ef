use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::EvalConfig;
use crate::provider::ProviderConfig;

#[derive(Parser)]
#[command(name = "agent-evals")]
#[command(
    author,
    version,
    about = "Overlap analysis, boundary testing, and metacognitive scoring for LLM agents",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Static analysis only (no API calls)
    Check {
        /// Agent definitions: a single file or a directory to scan
        path: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Static analysis + live probes
    Test {
        /// Agent definitions: a single file or a directory to scan
        path: PathBuf,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        probes: ProbeArgs,
    },
}

/// Report format for stdout or `--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Markdown,
}

/// Flags shared by every command that renders a report.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// CI mode: JSON output, no pager, exit 1 on failure
    #[arg(long)]
    pub ci: bool,

    /// Output format [default: terminal]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Path to agent-evals.yaml config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write report to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Disable automatic paging
    #[arg(long)]
    pub no_pager: bool,
}

impl ReportArgs {
    /// The format to render. `--ci` defaults to JSON unless `--format` was
    /// given explicitly.
    pub fn effective_format(&self) -> OutputFormat {
        match self.format {
            Some(format) => format,
            None if self.ci => OutputFormat::Json,
            None => OutputFormat::Terminal,
        }
    }

    pub fn paging_disabled(&self) -> bool {
        self.no_pager || self.ci
    }
}

/// Flags controlling the live probe run.
#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// LLM provider: anthropic, openai, openai-compatible
    #[arg(long, default_value = "anthropic")]
    pub provider: String,

    /// Model to use for probes
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL for openai-compatible provider
    #[arg(long)]
    pub base_url: Option<String>,

    /// Environment variable name for API key
    #[arg(long)]
    pub api_key_env: Option<String>,

    /// Max API calls for live probes
    #[arg(long, default_value_t = 500)]
    pub probe_budget: usize,

    /// Stochastic runs per probe
    #[arg(long, default_value_t = 5)]
    pub stochastic_runs: usize,

    /// Max concurrent API calls
    #[arg(long, default_value_t = 3)]
    pub concurrency: usize,

    /// Write full probe Q&A transcript to file (markdown)
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

/// Merges provider flags with the `probes:` section of the config file.
/// Flags win where set; `--provider` yields to config only while still at
/// its default.
pub fn resolve_provider_config(config: &EvalConfig, probe_args: &ProbeArgs) -> ProviderConfig {
    let probes = &config.probes;

    let filled = |flag: Option<&String>, fallback: Option<&String>| -> String {
        match flag {
            Some(v) if !v.is_empty() => v.clone(),
            _ => fallback.cloned().unwrap_or_default(),
        }
    };

    let mut provider = probe_args.provider.clone();
    if provider == "anthropic"
        && let Some(p) = &probes.provider
    {
        provider = p.clone();
    }

    ProviderConfig {
        provider,
        model: filled(probe_args.model.as_ref(), probes.model.as_ref()),
        base_url: filled(probe_args.base_url.as_ref(), probes.base_url.as_ref()),
        api_key_env: filled(probe_args.api_key_env.as_ref(), probes.api_key_env.as_ref()),
        max_tokens: 0,
    }
}
