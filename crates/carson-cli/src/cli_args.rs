use std::path::PathBuf;

use carson_review::ReviewConfigOverrides;
use clap::{Args, Parser, Subcommand};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "carson",
    about = "Review convergence gate and late-activity sweep for GitHub pull requests",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    #[arg(
        long = "repo-root",
        env = "CARSON_REPO_ROOT",
        global = true,
        default_value = ".",
        help = "Local git checkout used for remote and branch discovery"
    )]
    pub repo_root: PathBuf,

    #[arg(
        long,
        env = "CARSON_REPO",
        global = true,
        help = "Repository in owner/name form; skips git remote discovery"
    )]
    pub repo: Option<String>,

    #[arg(
        long = "config-file",
        env = "CARSON_CONFIG_FILE",
        global = true,
        help = "JSON configuration file (defaults to ~/.carson/config.json)"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long = "report-dir",
        env = "CARSON_REPORT_DIR",
        global = true,
        help = "Directory for review gate and sweep reports (defaults to ~/.cache/carson)"
    )]
    pub report_dir: Option<PathBuf>,

    #[arg(
        long = "wait-seconds",
        env = "CARSON_REVIEW_WAIT_SECONDS",
        global = true,
        help = "Warmup delay before the first review snapshot"
    )]
    pub wait_seconds: Option<u64>,

    #[arg(
        long = "poll-seconds",
        env = "CARSON_REVIEW_POLL_SECONDS",
        global = true,
        help = "Delay between consecutive review snapshots"
    )]
    pub poll_seconds: Option<u64>,

    #[arg(
        long = "max-polls",
        env = "CARSON_REVIEW_MAX_POLLS",
        global = true,
        value_parser = parse_positive_usize,
        help = "Maximum review snapshots before the gate gives up on convergence"
    )]
    pub max_polls: Option<usize>,

    #[arg(
        long = "sweep-window-days",
        env = "CARSON_REVIEW_SWEEP_WINDOW_DAYS",
        global = true,
        value_parser = parse_positive_u64,
        help = "Only pull requests updated within this many days are swept"
    )]
    pub sweep_window_days: Option<u64>,

    #[arg(
        long = "sweep-states",
        env = "CARSON_REVIEW_SWEEP_STATES",
        global = true,
        value_delimiter = ',',
        help = "Pull request states included in the sweep (open, closed)"
    )]
    pub sweep_states: Vec<String>,

    #[arg(
        long = "disposition-prefix",
        env = "CARSON_REVIEW_DISPOSITION_PREFIX",
        global = true,
        help = "Prefix that marks an author reply as a disposition"
    )]
    pub disposition_prefix: Option<String>,
}

impl Cli {
    pub fn config_overrides(&self) -> ReviewConfigOverrides {
        ReviewConfigOverrides {
            wait_seconds: self.wait_seconds,
            poll_seconds: self.poll_seconds,
            max_polls: self.max_polls,
            disposition_prefix: self.disposition_prefix.clone(),
            sweep_window_days: self.sweep_window_days,
            sweep_states: (!self.sweep_states.is_empty()).then(|| self.sweep_states.clone()),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Pull request review commands.
    #[command(subcommand)]
    Review(ReviewCommand),
}

#[derive(Debug, Subcommand)]
pub enum ReviewCommand {
    /// Block merge until review activity settles and every actionable item is addressed.
    Gate(GateArgs),
    /// Audit recently updated pull requests for late actionable review activity.
    Sweep,
}

#[derive(Debug, Clone, Args)]
pub struct GateArgs {
    #[arg(
        long = "pr",
        env = "CARSON_PR_NUMBER",
        value_parser = parse_positive_u64,
        help = "Pull request number to gate instead of the current branch's pull request"
    )]
    pub pr_number: Option<u64>,

    #[arg(long, help = "Branch name to report and look up (defaults to the checked-out branch)")]
    pub branch: Option<String>,
}
