use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use agent_evals::analysis::run_static_analysis;
use agent_evals::cli::{
    Cli, Commands, ProbeArgs, ReportArgs, check_ci_result, format_report, probe_progress_bar,
    resolve_provider_config, write_output,
};
use agent_evals::config::EvalConfig;
use agent_evals::error::{EvalError, Result};
use agent_evals::loader::load_agents_recursive;
use agent_evals::probes::{ProgressCallback, RunConfig, generate_probes, run_live_probes};
use agent_evals::provider::new_client;
use agent_evals::report::format_transcript;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "agent_evals=debug" } else { "agent_evals=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // Reports go to stdout; everything else stays on stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { path, report } => cmd_check(&path, &report),
        Commands::Test { path, report, probes } => cmd_test(&path, &report, &probes).await,
    }
}

fn cmd_check(path: &Path, report_args: &ReportArgs) -> Result<()> {
    let config = EvalConfig::load(report_args.config.as_deref(), path)?;

    let agents = load_agents_recursive(path, true)?;
    if agents.is_empty() {
        return Err(EvalError::NoAgents(path.display().to_string()));
    }
    eprintln!("Loaded {} agent(s) from {}", agents.len(), path.display());

    let static_report = run_static_analysis(agents, &config);

    let format = report_args.effective_format();
    let output = format_report(&static_report, None, format);
    write_output(&output, report_args.output.as_deref(), format, report_args.paging_disabled())?;

    if report_args.ci {
        return check_ci_result(&static_report, None, &config);
    }
    Ok(())
}

async fn cmd_test(path: &Path, report_args: &ReportArgs, probe_args: &ProbeArgs) -> Result<()> {
    let config = EvalConfig::load(report_args.config.as_deref(), path)?;

    let agents = load_agents_recursive(path, true)?;
    if agents.is_empty() {
        return Err(EvalError::NoAgents(path.display().to_string()));
    }
    eprintln!("Loaded {} agent(s) from {}", agents.len(), path.display());

    let static_report = run_static_analysis(agents, &config);
    let agents = &static_report.agents;

    let provider_config = resolve_provider_config(&config, probe_args);
    let client = match new_client(provider_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to initialize API client: {e}");
            eprintln!(
                "Set the appropriate API key env var (e.g. ANTHROPIC_API_KEY, OPENAI_API_KEY)."
            );
            std::process::exit(1);
        }
    };

    let questions = generate_probes(agents, probe_args.probe_budget);
    let total_calls = questions.len() * (1 + probe_args.stochastic_runs);
    eprintln!("Generated {} probes (budget: {})", questions.len(), probe_args.probe_budget);
    eprintln!("Running {total_calls} API calls...");

    let pb = probe_progress_bar(questions.len());
    let bar = pb.clone();
    let progress: ProgressCallback = Arc::new(move |done, _total, agent_id, probe_id| {
        bar.set_position(done as u64);
        bar.set_message(format!("{agent_id} / {probe_id}"));
    });

    let live = run_live_probes(
        agents,
        &questions,
        client,
        RunConfig {
            stochastic_runs: probe_args.stochastic_runs,
            batch_delay: Duration::from_millis(300),
            concurrency: probe_args.concurrency,
        },
        Some(progress),
    )
    .await;
    pb.finish_and_clear();

    let format = report_args.effective_format();
    let output = format_report(&static_report, Some(&live), format);
    write_output(&output, report_args.output.as_deref(), format, report_args.paging_disabled())?;

    if let Some(transcript_path) = &probe_args.transcript {
        std::fs::write(transcript_path, format_transcript(&live)).map_err(|source| {
            EvalError::WriteFile { path: transcript_path.clone(), source }
        })?;
        eprintln!("Transcript written to {}", transcript_path.display());
    }

    if report_args.ci {
        return check_ci_result(&static_report, Some(&live), &config);
    }
    Ok(())
}
