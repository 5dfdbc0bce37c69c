//! Idempotent lifecycle of the single rolling sweep tracking issue.

use anyhow::{Context, Result};
use carson_core::format_rfc3339_seconds;
use carson_github::{IssueState, IssueTracker, TrackingIssueState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::review_config::ReviewConfig;
use crate::review_report::{join_states, push_sweep_findings};
use crate::review_sweep::SweepFinding;

pub const TRACKING_LABEL_DESCRIPTION: &str = "Carson review sweep tracking";
pub const TRACKING_LABEL_COLOR: &str = "B60205";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingIssueAction {
    None,
    Created,
    CreateUnknown,
    Updated,
    ReopenedUpdated,
    Closed,
}

impl TrackingIssueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Created => "created",
            Self::CreateUnknown => "create_unknown",
            Self::Updated => "updated",
            Self::ReopenedUpdated => "reopened_updated",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TrackingIssueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingIssueOutcome {
    pub action: TrackingIssueAction,
    pub issue: Option<TrackingIssueState>,
}

/// Full tracking issue body for the current findings.
pub fn render_tracking_issue_body(
    config: &ReviewConfig,
    findings: &[SweepFinding],
    now: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "# Carson review sweep findings".to_string(),
        String::new(),
        format!("- Generated at: {}", format_rfc3339_seconds(now)),
        format!("- Window days: {}", config.sweep_window_days),
        format!("- States: {}", join_states(&config.sweep_states)),
        format!("- Finding count: {}", findings.len()),
        String::new(),
        "## Findings".to_string(),
    ];
    push_sweep_findings(&mut lines, findings);
    lines.join("\n")
}

/// Brings the tracking issue in line with `findings`.
///
/// The label is ensured first. The issue is correlated by exact title; with no
/// findings an open issue gets a clear comment and is closed, otherwise the
/// issue is created, reopened, or edited so its body lists every finding.
pub async fn reconcile_tracking_issue(
    issues: &dyn IssueTracker,
    config: &ReviewConfig,
    findings: &[SweepFinding],
    now: DateTime<Utc>,
) -> Result<TrackingIssueOutcome> {
    let title = config.tracking_issue_title.as_str();
    let label = config.tracking_issue_label.as_str();
    issues
        .ensure_label(label, TRACKING_LABEL_DESCRIPTION, TRACKING_LABEL_COLOR)
        .await
        .with_context(|| format!("failed to ensure label {label}"))?;
    let existing = find_issue(issues, title).await?;

    if findings.is_empty() {
        let Some(issue) = existing else {
            return Ok(TrackingIssueOutcome {
                action: TrackingIssueAction::None,
                issue: None,
            });
        };
        if issue.state != IssueState::Open {
            return Ok(TrackingIssueOutcome {
                action: TrackingIssueAction::None,
                issue: Some(issue),
            });
        }
        let message = format!(
            "Clear: no actionable late review activity detected at {}.",
            format_rfc3339_seconds(now)
        );
        issues
            .comment_on_issue(issue.number, &message)
            .await
            .with_context(|| format!("failed to comment on issue #{}", issue.number))?;
        issues
            .close_issue(issue.number)
            .await
            .with_context(|| format!("failed to close issue #{}", issue.number))?;
        tracing::info!(issue = issue.number, "tracking issue closed");
        let refreshed = find_issue(issues, title).await?;
        return Ok(TrackingIssueOutcome {
            action: TrackingIssueAction::Closed,
            issue: refreshed.or(Some(issue)),
        });
    }

    let body = render_tracking_issue_body(config, findings, now);
    let Some(issue) = existing else {
        issues
            .create_issue(title, &body, label)
            .await
            .context("failed to create review sweep tracking issue")?;
        let created = find_issue(issues, title).await?;
        let action = if created.is_some() {
            TrackingIssueAction::Created
        } else {
            TrackingIssueAction::CreateUnknown
        };
        tracing::info!(action = %action, "tracking issue created");
        return Ok(TrackingIssueOutcome {
            action,
            issue: created,
        });
    };

    let was_closed = issue.state == IssueState::Closed;
    if was_closed {
        issues
            .reopen_issue(issue.number)
            .await
            .with_context(|| format!("failed to reopen issue #{}", issue.number))?;
    }
    issues
        .edit_issue(issue.number, title, &body, label)
        .await
        .with_context(|| format!("failed to edit issue #{}", issue.number))?;
    let action = if was_closed {
        TrackingIssueAction::ReopenedUpdated
    } else {
        TrackingIssueAction::Updated
    };
    tracing::info!(issue = issue.number, action = %action, "tracking issue updated");
    let refreshed = find_issue(issues, title).await?;
    Ok(TrackingIssueOutcome {
        action,
        issue: refreshed.or(Some(issue)),
    })
}

async fn find_issue(issues: &dyn IssueTracker, title: &str) -> Result<Option<TrackingIssueState>> {
    issues
        .find_issue_by_title(title)
        .await
        .context("failed to list issues for review sweep")
}
