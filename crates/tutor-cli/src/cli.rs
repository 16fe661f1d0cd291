use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tutor", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to ./tutor.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate the set-busbar action space of a grid and write it to disk
    Generate(GenerateArgs),
    /// Summarize a persisted action space
    Inspect(InspectArgs),
    /// Rank the legal actions nearest to a model prediction
    Rank(RankArgs),
    /// Score predictions against labels over an action space
    Evaluate(EvaluateArgs),
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Grid topology JSON (falls back to `paths.grid_file`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub grid: Option<PathBuf>,
    /// Output directory (falls back to `paths.action_space_dir`)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: Option<PathBuf>,
    /// Build the space with this line out of service
    #[arg(long, conflicts_with = "all_lines")]
    pub disable_line: Option<usize>,
    /// Build the intact grid plus one space per disabled line
    #[arg(long)]
    pub all_lines: bool,
    /// Exclusion rule file (TOML or JSON)
    #[arg(long, conflicts_with = "preset", value_hint = ValueHint::FilePath)]
    pub rules: Option<PathBuf>,
    /// Built-in exclusion rules (`rte_case14_realistic` or `none`)
    #[arg(long)]
    pub preset: Option<String>,
    /// Comma-separated substation ids to enumerate (default: all)
    #[arg(long)]
    pub substations: Option<String>,
    /// Number of threads (`auto` = CPU count)
    #[arg(long, default_value = "auto")]
    pub threads: String,
    /// Enumerate substations one after another
    #[arg(long)]
    pub sequential: bool,
    /// Rebuild even when the output file already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Action-space file (.arrow)
    #[arg(value_hint = ValueHint::FilePath)]
    pub action_space: PathBuf,
    /// Grid topology JSON (falls back to `paths.grid_file`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub grid: Option<PathBuf>,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// Action-space file (.arrow)
    #[arg(value_hint = ValueHint::FilePath)]
    pub action_space: PathBuf,
    /// Grid topology JSON (falls back to `paths.grid_file`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub grid: Option<PathBuf>,
    /// Prediction vector as a JSON array of numbers
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub prediction: PathBuf,
    /// Substation to rank (default: most activated)
    #[arg(long)]
    pub substation: Option<usize>,
    /// Comma-separated substations eligible for selection
    #[arg(long)]
    pub legal: Option<String>,
    /// Distance metric (`l1` or `l2`; falls back to `resolver.metric`)
    #[arg(long)]
    pub metric: Option<String>,
    /// Action encoding (`assignment`, `second-busbar`, `topology-change`)
    #[arg(long)]
    pub encoding: Option<String>,
    /// Current topology vector as a JSON array, for `topology-change`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub topo_vect: Option<PathBuf>,
    /// Zero the prediction outside its most activated substation with
    /// actions, and rank that substation
    #[arg(long, conflicts_with = "substation")]
    pub restrict: bool,
    /// Number of actions to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Action-space file (.arrow)
    #[arg(value_hint = ValueHint::FilePath)]
    pub action_space: PathBuf,
    /// Grid topology JSON (falls back to `paths.grid_file`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub grid: Option<PathBuf>,
    /// JSON array of `{ "prediction": [...], "label": [...] }` samples
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub samples: PathBuf,
    /// Distance metric (falls back to `resolver.metric`)
    #[arg(long)]
    pub metric: Option<String>,
    /// Action encoding (falls back to `resolver.encoding`)
    #[arg(long)]
    pub encoding: Option<String>,
    /// Current topology vector as a JSON array, for `topology-change`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub topo_vect: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination (default: ./tutor.toml)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
