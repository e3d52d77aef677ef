//! Command-line interface.
//!
//! - `Cli`, `Commands`: argument definitions via clap
//! - `resolve_provider_config`: flag/config merge for the probe provider
//! - report delivery helpers: format dispatch, `--output` files, the pager
//! - `check_ci_result`: the `--ci` pass/fail gate

mod ci;
mod commands;
mod output;

pub use ci::check_ci_result;
pub use commands::{Cli, Commands, OutputFormat, ProbeArgs, ReportArgs, resolve_provider_config};
pub use output::{format_report, probe_progress_bar, write_output};
