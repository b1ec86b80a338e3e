use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "MitoSim Developers",
    version,
    about = "MitoSim CLI - A command-line interface for assembling and running declarative polymer/chromosome simulation pipelines.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the pipeline described by a scenario file and drive it through
    /// configuration, engine attachment, and the block loop.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub scenario: PathBuf,

    /// Root directory for the run folder; overrides the scenario file.
    /// The run folder itself is named from the resolved configuration.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override the number of simulation blocks from the scenario file.
    #[arg(short, long, value_name = "INT")]
    pub blocks: Option<usize>,

    /// Override the number of integration steps per block.
    #[arg(long, value_name = "INT")]
    pub steps_per_block: Option<usize>,

    /// Override the snapshot cadence in blocks (0 disables snapshots).
    #[arg(long, value_name = "INT")]
    pub snapshot_every: Option<usize>,

    /// Resolve the configuration and print the run folder name without
    /// persisting anything or entering the block loop.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the interactive progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
