//! surveyfit: passenger survey analysis CLI
//!
//! Loads a passenger table, cleans and profiles it, fits a logistic
//! regression on a stratified split and writes the report, cleaned CSV,
//! coefficients and figures.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use console::style;

use surveyfit::cli::Cli;
use surveyfit::pipeline::{run_pipeline, PipelineConfig, PipelineError};
use surveyfit::utils::{print_banner, print_completion, print_config, set_quiet, ConfigCard};

fn main() -> ExitCode {
    let cli = Cli::parse();
    set_quiet(cli.quiet);
    let config = cli.into_config();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Errors are reported even in quiet mode
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            if let Some(PipelineError::MissingInput { .. }) = err.downcast_ref::<PipelineError>() {
                eprintln!(
                    "{}",
                    style("Pass the dataset with --input <path> (default: titanic.csv)").dim()
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn run(config: &PipelineConfig) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));

    let scaling = config.scaling.to_string();
    print_config(&ConfigCard {
        input: &config.input,
        label: &config.label,
        output_dir: &config.output_dir,
        test_fraction: config.test_fraction,
        seed: config.seed,
        scaling: &scaling,
    });

    let outcome = run_pipeline(config)?;

    if !surveyfit::utils::is_quiet() {
        outcome.summary.display(&outcome.manifest);
    }
    print_completion(&config.output_dir);

    Ok(())
}
