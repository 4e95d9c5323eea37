// sextant_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use sextant_sim::cli::Cli;
use sextant_sim::config::{load_scenario, SimError};
use sextant_sim::logging::init_logging;
use sextant_sim::runner::{RunSummary, Simulation};

fn run(cli: &Cli) -> Result<RunSummary, SimError> {
    let mut config = load_scenario(&cli.scenario)?;
    cli.apply_overrides(&mut config);
    Simulation::new(config)?.run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    match run(&cli) {
        Ok(summary) => {
            info!("\n{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Simulation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
