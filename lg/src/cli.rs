//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// loadgen - weighted-task HTTP load generator
#[derive(Parser, Debug)]
#[command(name = "lg", version, about = "Weighted-task HTTP load generator", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate load with a scenario until the run time elapses or Ctrl-C
    Run {
        /// Scenario to run
        #[arg(default_value = "blog")]
        scenario: String,

        /// Target base address (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Number of simulated users (overrides config)
        #[arg(short, long)]
        users: Option<usize>,

        /// Users started per second (overrides config)
        #[arg(short = 'r', long)]
        spawn_rate: Option<f64>,

        /// Stop after this many seconds (overrides config)
        #[arg(short = 't', long = "run-time")]
        run_time_secs: Option<u64>,

        /// Base seed for reproducible task selection
        #[arg(long)]
        seed: Option<u64>,

        /// Summary format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List scenarios with their tasks, weights and wait policy
    Scenarios {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for summaries and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
