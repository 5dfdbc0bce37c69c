//! Report artifacts: paired JSON and Markdown files that overwrite the previous run.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carson_core::{write_json_pretty_atomic, write_text_atomic};
use serde_json::Value;

use crate::review_findings::Finding;
use crate::review_gate::GateReport;
use crate::review_sweep::{SweepFinding, SweepReport};

pub const REVIEW_GATE_REPORT_MD: &str = "review_gate_latest.md";
pub const REVIEW_GATE_REPORT_JSON: &str = "review_gate_latest.json";
pub const REVIEW_SWEEP_REPORT_MD: &str = "review_sweep_latest.md";
pub const REVIEW_SWEEP_REPORT_JSON: &str = "review_sweep_latest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Gate,
    Sweep,
}

impl ReportKind {
    pub fn markdown_name(&self) -> &'static str {
        match self {
            Self::Gate => REVIEW_GATE_REPORT_MD,
            Self::Sweep => REVIEW_SWEEP_REPORT_MD,
        }
    }

    pub fn json_name(&self) -> &'static str {
        match self {
            Self::Gate => REVIEW_GATE_REPORT_JSON,
            Self::Sweep => REVIEW_SWEEP_REPORT_JSON,
        }
    }

    fn console_key(&self) -> &'static str {
        match self {
            Self::Gate => "review_gate_report",
            Self::Sweep => "review_sweep_report",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// Destination for report artifacts.
pub trait ReportSink: Send + Sync {
    fn write_report(&self, kind: ReportKind, markdown: &str, json: &Value) -> Result<ReportPaths>;
}

#[derive(Debug, Clone)]
/// Writes reports into one directory, creating it on demand.
pub struct DirectoryReportSink {
    dir: PathBuf,
}

impl DirectoryReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for DirectoryReportSink {
    fn write_report(&self, kind: ReportKind, markdown: &str, json: &Value) -> Result<ReportPaths> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create report directory {}", self.dir.display())
        })?;
        let paths = ReportPaths {
            markdown: self.dir.join(kind.markdown_name()),
            json: self.dir.join(kind.json_name()),
        };
        write_json_pretty_atomic(&paths.json, json)?;
        write_text_atomic(&paths.markdown, markdown)?;
        Ok(paths)
    }
}

/// Writes a report and echoes the paths, or a SKIP line when writing fails.
///
/// A failed write never changes the verdict; only console errors propagate.
pub fn publish_report<T: serde::Serialize>(
    sink: &dyn ReportSink,
    kind: ReportKind,
    markdown: &str,
    report: &T,
    out: &mut (dyn Write + Send),
) -> Result<Option<ReportPaths>> {
    let written = serde_json::to_value(report)
        .context("failed to serialize report")
        .and_then(|json| sink.write_report(kind, markdown, &json));
    let key = kind.console_key();
    match written {
        Ok(paths) => {
            writeln!(out, "{key}_markdown: {}", paths.markdown.display())?;
            writeln!(out, "{key}_json: {}", paths.json.display())?;
            Ok(Some(paths))
        }
        Err(error) => {
            tracing::warn!(report = key, error = %format!("{error:#}"), "report write skipped");
            writeln!(out, "{key}_write: SKIP ({error:#})")?;
            Ok(None)
        }
    }
}

pub fn render_gate_markdown(report: &GateReport) -> String {
    let mut lines = vec![
        "# Carson Review Gate Report".to_string(),
        String::new(),
        format!("- Generated at: {}", report.generated_at),
        format!("- Branch: {}", report.branch),
        format!("- Status: {}", report.status),
        format!("- Converged: {}", report.converged),
        format!("- Poll attempts: {}", report.poll_attempts),
        format!("- Wait seconds: {}", report.wait_seconds),
        format!("- Poll seconds: {}", report.poll_seconds),
        format!("- Max polls: {}", report.max_polls),
        String::new(),
        "## Pull Request".to_string(),
    ];
    match &report.pr {
        Some(pr) => {
            lines.push(format!("- Number: #{}", pr.number));
            lines.push(format!("- Title: {}", pr.title));
            lines.push(format!("- URL: {}", pr.url));
            lines.push(format!("- State: {}", pr.state));
        }
        None => lines.push("- not available".to_string()),
    }
    lines.push(String::new());
    lines.push("## Block Reasons".to_string());
    push_or_none(
        &mut lines,
        report.block_reasons.iter().map(|reason| format!("- {reason}")),
    );
    lines.push(String::new());
    lines.push("## Unresolved Threads".to_string());
    push_or_none(
        &mut lines,
        report.unresolved_threads.iter().map(|entry| {
            format!(
                "- {} (author: {}, outdated: {})",
                entry.url,
                entry.author,
                entry.outdated.unwrap_or(false)
            )
        }),
    );
    lines.push(String::new());
    lines.push("## Unacknowledged Actionable Top-Level Findings".to_string());
    push_or_none(
        &mut lines,
        report
            .unacknowledged_actionable
            .iter()
            .map(render_actionable_line),
    );
    lines.push(String::new());
    lines.join("\n")
}

fn render_actionable_line(entry: &Finding) -> String {
    format!(
        "- {}: {} (author: {}, reason: {})",
        entry.kind, entry.url, entry.author, entry.reason
    )
}

pub fn render_sweep_markdown(report: &SweepReport) -> String {
    let mut lines = vec![
        "# Carson Review Sweep Report".to_string(),
        String::new(),
        format!("- Generated at: {}", report.generated_at),
        format!("- Status: {}", report.status),
        format!("- Window days: {}", report.window_days),
        format!("- States: {}", join_states(&report.states)),
        format!("- Cutoff time: {}", report.cutoff_time),
        format!("- Candidate count: {}", report.candidate_count),
        format!("- Finding count: {}", report.finding_count),
        format!("- Tracking issue action: {}", report.tracking_issue.action),
    ];
    if let Some(issue) = &report.tracking_issue.issue {
        lines.push(format!("- Tracking issue URL: {}", issue.url));
    }
    lines.push(String::new());
    lines.push("## Findings".to_string());
    push_sweep_findings(&mut lines, &report.findings);
    lines.join("\n")
}

/// Appends one bullet per sweep finding, or `- none`.
pub(crate) fn push_sweep_findings(lines: &mut Vec<String>, findings: &[SweepFinding]) {
    if findings.is_empty() {
        lines.push("- none".to_string());
        return;
    }
    for item in findings {
        lines.push(format!(
            "- PR #{} ({}) {}: {}",
            item.pr_number, item.pr_state, item.finding.kind, item.finding.reason
        ));
        lines.push(format!("  - URL: {}", item.finding.url));
        lines.push(format!("  - Author: {}", item.finding.author));
        lines.push(format!("  - Created at: {}", item.finding.created_at));
    }
}

pub(crate) fn join_states(states: &[crate::review_config::SweepState]) -> String {
    states
        .iter()
        .map(|state| state.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_or_none(lines: &mut Vec<String>, entries: impl Iterator<Item = String>) {
    let before = lines.len();
    lines.extend(entries);
    if lines.len() == before {
        lines.push("- none".to_string());
    }
}
