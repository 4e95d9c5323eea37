// sextant_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

use crate::config::ScenarioConfig;

/// Sextant: closed-loop simulation of odometry and vision pose fusion.
///
/// This struct defines the command-line arguments accepted by the
/// `sextant_sim` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Override the scenario's PRNG seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the scenario's duration, in seconds.
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Log filter directive, e.g. `debug` or `info,sextant_core=trace`.
    #[arg(long)]
    pub log: Option<String>,
}

impl Cli {
    /// Applies the command-line overrides on top of a loaded scenario.
    pub fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(duration) = self.duration {
            config.simulation.duration_secs = duration;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "sextant_sim",
            "--scenario",
            "custom.toml",
            "--seed",
            "9",
            "-d",
            "3.5",
            "--log",
            "trace",
        ]);
        assert_eq!(cli.scenario, PathBuf::from("custom.toml"));
        assert_eq!(cli.log.as_deref(), Some("trace"));

        let mut config = ScenarioConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.simulation.seed, 9);
        assert_eq!(config.simulation.duration_secs, 3.5);
    }

    #[test]
    fn defaults_leave_scenario_untouched() {
        let cli = Cli::parse_from(["sextant_sim"]);
        assert_eq!(cli.scenario, PathBuf::from("assets/scenarios/default.toml"));
        let mut config = ScenarioConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.simulation.seed, 42);
    }
}
