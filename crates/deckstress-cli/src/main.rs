use std::path::PathBuf;

use clap::Parser;

use deckstress_cli::config::{ResolvedOutputs, RunConfig};
use deckstress_cli::logging::init_logging;
use deckstress_cli::runner::StressRunner;

/// Checkpoint stress analysis for a single deck snapshot.
#[derive(Debug, Parser)]
#[command(
    name = "deckstress",
    author,
    version,
    about = "Deterministic deck stress-probability runner"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "fixtures/run.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Force a specific stress model regardless of selection rules.
    #[arg(long, value_name = "MODEL_ID")]
    override_model: Option<String>,

    /// Exit after validating the configuration and payloads (no analysis is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RunConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(model_id) = cli.override_model {
        config.request.override_model_id = Some(model_id);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();

    println!(
        "Loaded configuration '{run_id}' for format '{}' (bracket {}, profile {})",
        config.request.format,
        config.request.bracket_id.as_deref().unwrap_or("-"),
        config.request.profile_id.as_deref().unwrap_or("-"),
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = StressRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: stress analysis skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Stress analysis complete for '{run_id}': {} ({} operators over {} buckets)",
        summary.status.as_str(),
        summary.operators_applied,
        summary.buckets,
    );
    if let Some(model_id) = summary.selected_model_id.as_deref() {
        println!("Model: {model_id}");
    }
    println!("Report: {}", summary.report_path.display());
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(guard) = logging_guard.as_ref() {
        println!("Structured log: {}", guard.log_path.display());
    }

    Ok(())
}
