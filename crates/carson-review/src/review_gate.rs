//! Merge-readiness gate over a pull request's settled review state.

use std::io::Write;

use anyhow::{Context, Result};
use carson_core::format_rfc3339_seconds;
use carson_github::PullRequestSummary;
use serde::{Deserialize, Serialize};

use crate::review_convergence::{ConvergencePoller, PollSettings};
use crate::review_findings::Finding;
use crate::review_report::{publish_report, render_gate_markdown, ReportKind};
use crate::review_runtime::{ReviewRuntime, ReviewStatus};

pub const NO_PULL_REQUEST_REASON: &str = "no pull request found for current branch";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Which pull request the gate evaluates.
pub struct GateRequest {
    pub branch: String,
    /// Explicit pull request number, used instead of the branch lookup.
    pub pr_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    pub generated_at: String,
    pub branch: String,
    pub status: ReviewStatus,
    pub converged: bool,
    pub wait_seconds: u64,
    pub poll_seconds: u64,
    pub max_polls: usize,
    pub poll_attempts: usize,
    pub block_reasons: Vec<String>,
    pub pr: Option<PullRequestSummary>,
    pub unresolved_threads: Vec<Finding>,
    pub actionable_top_level: Vec<Finding>,
    pub unacknowledged_actionable: Vec<Finding>,
}

/// Block reasons for a finished poll; each condition contributes independently.
pub fn gate_block_reasons(
    converged: bool,
    max_polls: usize,
    unresolved_threads: usize,
    unacknowledged_actionable: usize,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if !converged {
        reasons.push(format!(
            "review snapshot did not converge within {max_polls} polls"
        ));
    }
    if unresolved_threads > 0 {
        reasons.push(format!(
            "unresolved review threads remain ({unresolved_threads})"
        ));
    }
    if unacknowledged_actionable > 0 {
        reasons.push(format!(
            "actionable top-level comments/reviews without required disposition ({unacknowledged_actionable})"
        ));
    }
    reasons
}

/// Runs the review gate, writes its report, and returns the verdict.
pub async fn run_review_gate(
    runtime: &ReviewRuntime<'_>,
    request: &GateRequest,
    out: &mut (dyn Write + Send),
) -> Result<GateReport> {
    let config = runtime.config;
    let summary = match request.pr_number {
        Some(number) => Some(
            runtime
                .pull_requests
                .fetch_pull_request(number)
                .await
                .with_context(|| format!("failed to read pull request #{number}"))?
                .summary(),
        ),
        None => runtime
            .pull_requests
            .pull_request_for_branch(&request.branch)
            .await
            .with_context(|| format!("failed to find pull request for branch {}", request.branch))?,
    };

    let Some(summary) = summary else {
        writeln!(out, "BLOCK: no pull request found for branch {}.", request.branch)?;
        let report = GateReport {
            generated_at: format_rfc3339_seconds(runtime.clock.now()),
            branch: request.branch.clone(),
            status: ReviewStatus::Block,
            converged: false,
            wait_seconds: config.wait_seconds,
            poll_seconds: config.poll_seconds,
            max_polls: config.max_polls,
            poll_attempts: 0,
            block_reasons: vec![NO_PULL_REQUEST_REASON.to_string()],
            pr: None,
            unresolved_threads: Vec::new(),
            actionable_top_level: Vec::new(),
            unacknowledged_actionable: Vec::new(),
        };
        tracing::info!(branch = %request.branch, "review gate blocked: no pull request");
        publish_report(
            runtime.reports,
            ReportKind::Gate,
            &render_gate_markdown(&report),
            &report,
            out,
        )?;
        return Ok(report);
    };

    let poller = ConvergencePoller::new(
        runtime.pull_requests,
        runtime.sleeper,
        &runtime.vocabulary,
        PollSettings {
            wait_seconds: config.wait_seconds,
            poll_seconds: config.poll_seconds,
            max_polls: config.max_polls,
        },
    );
    let outcome = poller.run(summary.number, out).await?;
    let converged = outcome.converged();
    let poll_attempts = outcome.poll_attempts();
    let snapshot = outcome.snapshot;
    let block_reasons = gate_block_reasons(
        converged,
        config.max_polls,
        snapshot.unresolved_threads.len(),
        snapshot.unacknowledged_actionable.len(),
    );

    let report = GateReport {
        generated_at: format_rfc3339_seconds(runtime.clock.now()),
        branch: request.branch.clone(),
        status: ReviewStatus::from_blocking(!block_reasons.is_empty()),
        converged,
        wait_seconds: config.wait_seconds,
        poll_seconds: config.poll_seconds,
        max_polls: config.max_polls,
        poll_attempts,
        block_reasons,
        pr: Some(summary),
        unresolved_threads: snapshot.unresolved_threads,
        actionable_top_level: snapshot.actionable_top_level,
        unacknowledged_actionable: snapshot.unacknowledged_actionable,
    };
    tracing::info!(
        status = %report.status,
        converged,
        poll_attempts,
        "review gate decided"
    );
    publish_report(
        runtime.reports,
        ReportKind::Gate,
        &render_gate_markdown(&report),
        &report,
        out,
    )?;
    if report.block_reasons.is_empty() {
        writeln!(out, "OK: review gate passed.")?;
    } else {
        for reason in &report.block_reasons {
            writeln!(out, "BLOCK: {reason}")?;
        }
    }
    Ok(report)
}
