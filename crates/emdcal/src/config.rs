//! Application configuration from CLI flags and environment.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use emdcal_orchestration::EngineConfig;

/// emdcal: calibration experiments for the EMD model-falsification criterion.
#[derive(Parser, Debug)]
#[command(name = "emdcal", version, about)]
pub struct AppConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (debug logs, every curve point).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (no progress bar or tables).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum number of worker threads; 0 uses every core.
    #[arg(long, default_value = "0", env = "EMDCAL_MAX_CORES", global = true)]
    pub max_cores: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a calibration experiment and write the packed results.
    Run {
        /// Experiment file (JSON). Built-in defaults when omitted.
        #[arg(short, long, env = "EMDCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Where to write the packed results. Printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the calibration curves stored in a packed result file.
    Unpack {
        /// Packed result file written by `run`.
        input: PathBuf,

        /// Experiment file the results were computed with.
        #[arg(short, long, env = "EMDCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Print curves as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Write the default experiment file.
    Init {
        /// Destination. Printed to stdout when omitted.
        output: Option<PathBuf>,
    },

    /// Generate a shell completion script.
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Engine settings derived from the flags.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig::with_max_cores(self.max_cores)
    }
}
