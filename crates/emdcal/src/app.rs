//! Application entry point and dispatch.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use emdcal_cli::output::{read_output, write_json};
use emdcal_cli::presenter::CurvePresenter;
use emdcal_cli::progress::CliProgressReporter;
use emdcal_cli::ui::print_success;

use crate::config::{AppConfig, Command};
use crate::experiment::ExperimentConfig;

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    match &config.command {
        Command::Run {
            config: experiment,
            output,
        } => run_experiment(config, experiment.as_deref(), output.as_deref()),
        Command::Unpack {
            input,
            config: experiment,
            json,
        } => run_unpack(config, input, experiment.as_deref(), *json),
        Command::Init { output } => run_init(output.as_deref()),
        Command::Completion { shell } => {
            let mut cmd = <AppConfig as clap::CommandFactory>::command();
            emdcal_cli::completion::generate_completion(&mut cmd, *shell, &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_experiment(path: Option<&Path>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => Ok(ExperimentConfig::load(path)?),
        None => {
            info!("No experiment file given, using built-in defaults");
            Ok(ExperimentConfig::default())
        }
    }
}

fn run_experiment(config: &AppConfig, experiment: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let experiment = load_experiment(experiment)?;
    let task = experiment.build_task()?;
    let engine = config.engine();
    let reporter = CliProgressReporter::new(config.quiet);

    let start = Instant::now();
    let packed = task
        .run(&engine, &reporter)
        .context("calibration run failed")?;
    let duration = start.elapsed();

    match output {
        Some(path) => {
            write_json(path, &packed)
                .with_context(|| format!("cannot write results to {}", path.display()))?;
            if !config.quiet {
                print_success(&format!(
                    "{} experiments written to {}",
                    packed.bemd.len(),
                    path.display()
                ));
                let curves = task.unpack_curves(&packed)?;
                CurvePresenter::new(config.verbose, config.quiet).present_curves(&curves, Some(duration));
            }
        }
        None => {
            let json = serde_json::to_string_pretty(&packed)?;
            writeln!(std::io::stdout(), "{json}")?;
        }
    }
    Ok(())
}

fn run_unpack(config: &AppConfig, input: &Path, experiment: Option<&Path>, json: bool) -> Result<()> {
    let experiment = load_experiment(experiment)?;
    let task = experiment.build_task()?;
    let packed = read_output(input).with_context(|| format!("cannot read {}", input.display()))?;
    let curves = task.unpack_curves(&packed)?;

    if json {
        let json = serde_json::to_string_pretty(&curves)?;
        writeln!(std::io::stdout(), "{json}")?;
    } else {
        CurvePresenter::new(config.verbose, config.quiet).present_curves(&curves, None);
    }
    Ok(())
}

fn run_init(output: Option<&Path>) -> Result<()> {
    let experiment = ExperimentConfig::default();
    match output {
        Some(path) => {
            write_json(path, &experiment)
                .with_context(|| format!("cannot write {}", path.display()))?;
            print_success(&format!("Default experiment written to {}", path.display()));
        }
        None => {
            let json = serde_json::to_string_pretty(&experiment)?;
            writeln!(std::io::stdout(), "{json}")?;
        }
    }
    Ok(())
}
