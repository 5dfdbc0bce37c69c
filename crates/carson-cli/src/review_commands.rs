//! Wires parsed CLI arguments to the review gate and review sweep.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use carson_github::repository::{current_branch, locate_repository};
use carson_github::{GithubClient, GithubError, ProcessCommandRunner, RepoRef};
use carson_review::{
    default_config_path, default_report_dir, run_review_gate, run_review_sweep,
    DirectoryReportSink, GateRequest, ReviewConfig, ReviewRuntime, ReviewStatus,
    SystemReviewClock, TokioPollSleeper, EXIT_ERROR,
};

use crate::cli_args::{Cli, CliCommand, GateArgs, ReviewCommand};

/// Runs the parsed command and returns the process exit code.
pub async fn run_cli(cli: Cli, out: &mut (dyn Write + Send)) -> i32 {
    let config_path = cli.config_file.clone().or_else(default_config_path);
    let config = match ReviewConfig::load(config_path.as_deref(), &cli.config_overrides()) {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(out, "CONFIG ERROR: {error}");
            return EXIT_ERROR;
        }
    };

    let CliCommand::Review(command) = &cli.command;
    let title = match command {
        ReviewCommand::Gate(_) => "Review Gate",
        ReviewCommand::Sweep => "Review Sweep",
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "[{title}]");

    match run_review_command(&cli, command, &config, out).await {
        Ok(status) => status.exit_code(),
        Err(error) => {
            tracing::debug!(error = ?error, "review command failed");
            let _ = writeln!(out, "ERROR: {}", describe_failure(&error));
            EXIT_ERROR
        }
    }
}

/// Builds the single-threaded runtime every CLI command is driven on.
pub fn build_cli_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Runs the parsed command to completion on a fresh current-thread runtime.
pub fn run_cli_blocking(cli: Cli, out: &mut (dyn Write + Send)) -> i32 {
    match build_cli_runtime() {
        Ok(runtime) => runtime.block_on(run_cli(cli, out)),
        Err(error) => {
            let _ = writeln!(out, "ERROR: failed to start async runtime: {error}");
            EXIT_ERROR
        }
    }
}

fn describe_failure(error: &anyhow::Error) -> String {
    match error.downcast_ref::<GithubError>() {
        Some(GithubError::CommandUnavailable { program, .. }) if program == "gh" => {
            "gh CLI not available in PATH.".to_string()
        }
        _ => format!("{error:#}"),
    }
}

async fn run_review_command(
    cli: &Cli,
    command: &ReviewCommand,
    config: &ReviewConfig,
    out: &mut (dyn Write + Send),
) -> Result<ReviewStatus> {
    let gh = Arc::new(ProcessCommandRunner::gh(&cli.repo_root));
    let git = ProcessCommandRunner::git(&cli.repo_root);

    let repo = match cli.repo.as_deref() {
        Some(slug) => RepoRef::parse(slug)?,
        None => locate_repository(&git, gh.as_ref(), &config.git_remote).await?,
    };
    let client = GithubClient::new(gh, repo);
    client.ensure_available().await?;
    tracing::info!(repo = %client.repo().as_slug(), "review command starting");

    let reports = DirectoryReportSink::new(report_dir(cli));
    let sleeper = TokioPollSleeper;
    let clock = SystemReviewClock;
    let runtime = ReviewRuntime::new(config, &client, &client, &sleeper, &clock, &reports)?;

    match command {
        ReviewCommand::Gate(args) => {
            let request = gate_request(args, &git).await?;
            let report = run_review_gate(&runtime, &request, out).await?;
            Ok(report.status)
        }
        ReviewCommand::Sweep => {
            let report = run_review_sweep(&runtime, out).await?;
            Ok(report.status)
        }
    }
}

async fn gate_request(args: &GateArgs, git: &ProcessCommandRunner) -> Result<GateRequest> {
    let branch = match &args.branch {
        Some(branch) => branch.clone(),
        None => current_branch(git)
            .await
            .context("failed to resolve current branch")?,
    };
    Ok(GateRequest {
        branch,
        pr_number: args.pr_number,
    })
}

fn report_dir(cli: &Cli) -> PathBuf {
    cli.report_dir.clone().unwrap_or_else(default_report_dir)
}
