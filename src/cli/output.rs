//! Report delivery: file output, pager handling and the live progress bar.

use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use console::user_attended;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::analysis::StaticReport;
use crate::cli::OutputFormat;
use crate::error::{EvalError, Result};
use crate::probes::LiveProbeReport;
use crate::report::{format_json, format_markdown, format_terminal};

pub fn format_report(
    static_report: &StaticReport,
    live: Option<&LiveProbeReport>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => format_json(static_report, live),
        OutputFormat::Markdown => format_markdown(static_report, live),
        OutputFormat::Terminal => format_terminal(static_report, live),
    }
}

/// Delivers a rendered report: to `--output` when given, through a pager
/// for terminal output on a TTY, else straight to stdout.
pub fn write_output(
    output: &str,
    path: Option<&Path>,
    format: OutputFormat,
    no_pager: bool,
) -> Result<()> {
    if let Some(path) = path {
        std::fs::write(path, output)
            .map_err(|source| EvalError::WriteFile { path: path.to_path_buf(), source })?;
        eprintln!("Report written to {}", path.display());
        return Ok(());
    }

    if format == OutputFormat::Terminal && !no_pager && user_attended() {
        page_output(output);
        return Ok(());
    }

    print!("{output}");
    Ok(())
}

/// Pipes output through `$PAGER` (default `less`), falling back to plain
/// stdout when the pager cannot be spawned.
fn page_output(output: &str) {
    let pager = std::env::var("PAGER").ok().filter(|p| !p.is_empty());
    let pager = pager.as_deref().unwrap_or("less");

    let mut cmd = Command::new(pager);
    if pager == "less" {
        // -R preserves ANSI colors, -X leaves output on screen after quit.
        cmd.args(["-R", "-X"]);
    }

    let mut child = match cmd.stdin(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(pager = %pager, error = %e, "Pager unavailable, writing directly");
            print!("{output}");
            return;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // The user may quit the pager before it reads everything.
        let _ = stdin.write_all(output.as_bytes());
    }
    let _ = child.wait();
}

/// Progress bar for the live run, advanced once per completed probe.
pub fn probe_progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:24.cyan/blue} {pos}/{len} {msg}")
            .expect("static template")
            .progress_chars("█░░"),
    );
    pb
}
