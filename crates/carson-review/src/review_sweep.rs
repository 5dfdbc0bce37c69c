//! Retroactive audit of recently active pull requests for late review activity.

use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};
use carson_core::{format_rfc3339_seconds, parse_rfc3339_utc};
use carson_github::{
    PullRequestComment, PullRequestReview, PullRequestSnapshot, PullRequestState,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::review_config::SweepState;
use crate::review_findings::{
    deduplicate_by_url, unresolved_threads, Finding, FindingKind, ReviewVocabulary,
};
use crate::review_report::{publish_report, render_sweep_markdown, ReportKind};
use crate::review_runtime::{ReviewRuntime, ReviewStatus};
use crate::tracking_issue::{reconcile_tracking_issue, TrackingIssueOutcome};

pub const SWEEP_UNRESOLVED_THREAD_REASON: &str = "unresolved review thread";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A finding together with the pull request it was found on.
pub struct SweepFinding {
    pub pr_number: u64,
    pub pr_title: String,
    pub pr_url: String,
    pub pr_state: PullRequestState,
    #[serde(flatten)]
    pub finding: Finding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub generated_at: String,
    pub status: ReviewStatus,
    pub window_days: u64,
    pub states: Vec<SweepState>,
    pub cutoff_time: String,
    pub candidate_count: usize,
    pub finding_count: usize,
    pub findings: Vec<SweepFinding>,
    pub tracking_issue: TrackingIssueOutcome,
}

/// Merge time, else close time, for a finished pull request; open ones have none.
pub fn late_event_baseline(snapshot: &PullRequestSnapshot) -> Option<DateTime<Utc>> {
    if snapshot.state.is_open() {
        return None;
    }
    snapshot
        .merged_at
        .as_deref()
        .and_then(parse_rfc3339_utc)
        .or_else(|| snapshot.closed_at.as_deref().and_then(parse_rfc3339_utc))
}

/// Events are included when there is no baseline or they happened strictly after it.
pub fn include_sweep_event(created_at: &str, baseline: Option<DateTime<Utc>>) -> bool {
    let Some(baseline) = baseline else {
        return true;
    };
    parse_rfc3339_utc(created_at).is_some_and(|event| event > baseline)
}

/// Late findings on one pull request, deduplicated by url.
pub fn sweep_findings_for_pull_request(
    snapshot: &PullRequestSnapshot,
    vocabulary: &ReviewVocabulary,
) -> Vec<SweepFinding> {
    let pr_author = snapshot.author.as_str();
    let baseline = late_event_baseline(snapshot);
    let mut findings = Vec::new();

    for thread in unresolved_threads(snapshot) {
        if !include_sweep_event(&thread.created_at, baseline) {
            continue;
        }
        findings.push(Finding {
            reason: SWEEP_UNRESOLVED_THREAD_REASON.to_string(),
            outdated: None,
            ..thread
        });
    }

    let risk_finding = |kind: FindingKind, comment: &PullRequestComment| -> Option<Finding> {
        if comment.author == pr_author {
            return None;
        }
        let hits = vocabulary.risk_hits(&comment.body);
        if hits.is_empty() || !include_sweep_event(&comment.created_at, baseline) {
            return None;
        }
        Some(Finding {
            kind,
            url: comment.url.clone(),
            author: comment.author.clone(),
            created_at: comment.created_at.clone(),
            reason: format!("risk keywords: {}", hits.join(", ")),
            outdated: None,
        })
    };

    findings.extend(
        snapshot
            .comments
            .iter()
            .filter_map(|comment| risk_finding(FindingKind::RiskIssueComment, comment)),
    );
    findings.extend(
        snapshot
            .reviews
            .iter()
            .map(PullRequestReview::as_comment)
            .filter_map(|review| risk_finding(FindingKind::RiskReview, &review)),
    );
    findings.extend(
        snapshot
            .thread_comments()
            .filter_map(|comment| risk_finding(FindingKind::RiskThreadComment, comment)),
    );

    deduplicate_by_url(findings)
        .into_iter()
        .map(|finding| SweepFinding {
            pr_number: snapshot.number,
            pr_title: snapshot.title.clone(),
            pr_url: snapshot.url.clone(),
            pr_state: snapshot.state,
            finding,
        })
        .collect()
}

/// Drops findings whose url was already reported by an earlier candidate.
pub fn deduplicate_sweep_findings(findings: Vec<SweepFinding>) -> Vec<SweepFinding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|item| seen.insert(item.finding.url.clone()))
        .collect()
}

/// Orders findings by pull request number, then created_at text, then url.
pub fn sort_sweep_findings(findings: &mut [SweepFinding]) {
    findings.sort_by(|left, right| {
        (left.pr_number, &left.finding.created_at, &left.finding.url).cmp(&(
            right.pr_number,
            &right.finding.created_at,
            &right.finding.url,
        ))
    });
}

/// Runs the review sweep, reconciles the tracking issue, writes the report,
/// and returns the verdict.
pub async fn run_review_sweep(
    runtime: &ReviewRuntime<'_>,
    out: &mut (dyn Write + Send),
) -> Result<SweepReport> {
    let config = runtime.config;
    let now = runtime.clock.now();
    let cutoff = i64::try_from(config.sweep_window_days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut listed = HashSet::new();
    let candidates: Vec<_> = runtime
        .pull_requests
        .list_recent_pull_requests(cutoff)
        .await
        .context("failed to list pull requests for review sweep")?
        .into_iter()
        .filter(|pr| config.includes_sweep_state(pr.state) && listed.insert(pr.number))
        .collect();
    writeln!(out, "window_days: {}", config.sweep_window_days)?;
    writeln!(out, "candidate_prs: {}", candidates.len())?;

    let mut findings = Vec::new();
    for candidate in &candidates {
        let snapshot = runtime
            .pull_requests
            .fetch_pull_request(candidate.number)
            .await
            .with_context(|| format!("failed to read pull request #{}", candidate.number))?;
        let pr_findings = sweep_findings_for_pull_request(&snapshot, &runtime.vocabulary);
        tracing::debug!(
            number = candidate.number,
            findings = pr_findings.len(),
            "sweep candidate scanned"
        );
        findings.extend(pr_findings);
    }
    let mut findings = deduplicate_sweep_findings(findings);
    sort_sweep_findings(&mut findings);

    let tracking_issue = reconcile_tracking_issue(runtime.issues, config, &findings, now).await?;
    let report = SweepReport {
        generated_at: format_rfc3339_seconds(now),
        status: ReviewStatus::from_blocking(!findings.is_empty()),
        window_days: config.sweep_window_days,
        states: config.sweep_states.clone(),
        cutoff_time: format_rfc3339_seconds(cutoff),
        candidate_count: candidates.len(),
        finding_count: findings.len(),
        findings,
        tracking_issue,
    };
    tracing::info!(
        status = %report.status,
        candidates = report.candidate_count,
        findings = report.finding_count,
        tracking_action = %report.tracking_issue.action,
        "review sweep decided"
    );
    publish_report(
        runtime.reports,
        ReportKind::Sweep,
        &render_sweep_markdown(&report),
        &report,
        out,
    )?;
    writeln!(out, "finding_count: {}", report.finding_count)?;
    match report.status {
        ReviewStatus::Ok => writeln!(out, "OK: no actionable late review activity detected.")?,
        ReviewStatus::Block => writeln!(out, "BLOCK: actionable late review activity detected.")?,
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use carson_github::{PullRequestState, RecentPullRequest};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::{
        deduplicate_sweep_findings, include_sweep_event, late_event_baseline, run_review_sweep,
        sort_sweep_findings, sweep_findings_for_pull_request, SweepFinding,
    };
    use crate::review_config::{ReviewConfig, SweepState};
    use crate::review_findings::fixtures::{comment, review, snapshot, thread};
    use crate::review_findings::{FindingKind, ReviewVocabulary};
    use crate::review_report::{
        render_sweep_markdown, DirectoryReportSink, REVIEW_SWEEP_REPORT_JSON,
    };
    use crate::review_runtime::{ReviewClock, ReviewRuntime, ReviewStatus};
    use crate::test_support::{console_text, FakeRemote, RecordingSleeper};
    use crate::tracking_issue::TrackingIssueAction;

    struct FixedClock;

    impl ReviewClock for FixedClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).single().expect("time")
        }
    }

    fn vocabulary() -> ReviewVocabulary {
        ReviewVocabulary::from_config(&ReviewConfig::default()).expect("vocabulary")
    }

    fn recent(number: u64, state: PullRequestState) -> RecentPullRequest {
        RecentPullRequest {
            number,
            title: format!("Change {number}"),
            url: format!("https://github.com/acme/widgets/pull/{number}"),
            state,
            updated_at: "2026-03-03T00:00:00Z".to_string(),
            merged_at: None,
            closed_at: None,
            author: "alice".to_string(),
        }
    }

    fn merged_pr_with_late_comment() -> carson_github::PullRequestSnapshot {
        let mut pr = snapshot(12, PullRequestState::Merged);
        pr.merged_at = Some("2026-03-02T00:00:00Z".to_string());
        pr.closed_at = Some("2026-03-02T00:00:00Z".to_string());
        pr.comments = vec![
            comment(
                "bob",
                "possible regression before merge",
                "https://github.com/acme/widgets/pull/12#issuecomment-1",
                "2026-03-01T00:00:00Z",
            ),
            comment(
                "bob",
                "this is a regression",
                "https://github.com/acme/widgets/pull/12#issuecomment-2",
                "2026-03-03T00:00:00Z",
            ),
            comment(
                "alice",
                "my own bug",
                "https://github.com/acme/widgets/pull/12#issuecomment-3",
                "2026-03-03T01:00:00Z",
            ),
        ];
        pr
    }

    #[test]
    fn unit_baseline_prefers_merge_time_for_finished_pull_requests() {
        let mut pr = snapshot(1, PullRequestState::Closed);
        pr.merged_at = Some("2026-03-02T00:00:00Z".to_string());
        pr.closed_at = Some("2026-03-02T05:00:00Z".to_string());
        assert_eq!(
            late_event_baseline(&pr),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).single().expect("time"))
        );
        pr.merged_at = None;
        assert_eq!(
            late_event_baseline(&pr),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).single().expect("time"))
        );
        let mut open = snapshot(2, PullRequestState::Open);
        open.closed_at = Some("2026-03-02T05:00:00Z".to_string());
        assert_eq!(late_event_baseline(&open), None);
    }

    #[test]
    fn unit_include_event_is_strictly_after_baseline() {
        let baseline = Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).single().expect("time"));
        assert!(include_sweep_event("2026-03-02T00:00:01Z", baseline));
        assert!(!include_sweep_event("2026-03-02T00:00:00Z", baseline));
        assert!(!include_sweep_event("garbage", baseline));
        assert!(include_sweep_event("garbage", None));
        assert!(include_sweep_event("2020-01-01T00:00:00Z", None));
    }

    #[test]
    fn functional_closed_pull_request_reports_only_late_events() {
        let findings =
            sweep_findings_for_pull_request(&merged_pr_with_late_comment(), &vocabulary());
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].finding.url,
            "https://github.com/acme/widgets/pull/12#issuecomment-2"
        );
        assert_eq!(findings[0].finding.kind, FindingKind::RiskIssueComment);
        assert_eq!(findings[0].finding.reason, "risk keywords: regression");
        assert_eq!(findings[0].pr_state, PullRequestState::Merged);
    }

    #[test]
    fn functional_open_pull_request_reports_every_risk_event() {
        let mut pr = snapshot(3, PullRequestState::Open);
        pr.comments = vec![comment("bob", "security issue", "c1", "2020-01-01T00:00:00Z")];
        pr.reviews = vec![review("carol", "COMMENTED", "Disposition-free bug report", "r1", "")];
        pr.review_threads = vec![
            thread(
                false,
                false,
                vec![comment("dave", "this will fail", "t1", "2026-03-01T00:00:00Z")],
            ),
            thread(
                true,
                false,
                vec![comment("dave", "block", "t2", "2026-03-01T00:00:00Z")],
            ),
        ];
        let findings = sweep_findings_for_pull_request(&pr, &vocabulary());
        let summary: Vec<(&str, FindingKind, &str)> = findings
            .iter()
            .map(|item| {
                (
                    item.finding.url.as_str(),
                    item.finding.kind,
                    item.finding.reason.as_str(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("t1", FindingKind::UnresolvedThread, "unresolved review thread"),
                ("c1", FindingKind::RiskIssueComment, "risk keywords: security"),
                ("r1", FindingKind::RiskReview, "risk keywords: bug"),
                ("t2", FindingKind::RiskThreadComment, "risk keywords: block"),
            ]
        );
    }

    #[test]
    fn unit_findings_sort_by_pull_request_time_then_url() {
        let make = |pr_number: u64, created_at: &str, url: &str| -> SweepFinding {
            let mut pr = snapshot(pr_number, PullRequestState::Open);
            pr.comments = vec![comment("bob", "bug", url, created_at)];
            sweep_findings_for_pull_request(&pr, &vocabulary()).remove(0)
        };
        let mut findings = vec![
            make(9, "2026-03-01T00:00:00Z", "b"),
            make(2, "2026-03-02T00:00:00Z", "a"),
            make(9, "2026-03-01T00:00:00Z", "a"),
            make(2, "2026-03-01T00:00:00Z", "z"),
        ];
        sort_sweep_findings(&mut findings);
        let keys: Vec<(u64, &str)> = findings
            .iter()
            .map(|item| (item.pr_number, item.finding.url.as_str()))
            .collect();
        assert_eq!(keys, vec![(2, "z"), (2, "a"), (9, "a"), (9, "b")]);
    }

    #[tokio::test]
    async fn integration_sweep_filters_states_reports_and_opens_tracking_issue() {
        let remote = FakeRemote {
            recent: vec![recent(12, PullRequestState::Merged), recent(13, PullRequestState::Open)],
            ..FakeRemote::default()
        }
        .with_snapshots(12, vec![merged_pr_with_late_comment()]);
        let sleeper = RecordingSleeper::default();
        let temp = tempdir().expect("tempdir");
        let sink = DirectoryReportSink::new(temp.path());
        let config = ReviewConfig {
            sweep_states: vec![SweepState::Closed],
            ..ReviewConfig::default()
        };
        let runtime = ReviewRuntime::new(&config, &remote, &remote, &sleeper, &FixedClock, &sink)
            .expect("runtime");
        let mut out = Vec::new();

        let report = run_review_sweep(&runtime, &mut out).await.expect("sweep");

        assert_eq!(report.status, ReviewStatus::Block);
        assert_eq!(report.candidate_count, 1);
        assert_eq!(report.finding_count, 1);
        assert_eq!(report.cutoff_time, "2026-03-01T08:00:00Z");
        assert_eq!(report.tracking_issue.action, TrackingIssueAction::Created);
        assert_eq!(
            remote.listed_cutoffs.lock().expect("cutoffs")[0],
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("time")
        );
        assert!(!remote.calls().contains(&"fetch 13".to_string()));

        let console = console_text(&out);
        assert!(console.starts_with("window_days: 3\ncandidate_prs: 1\n"));
        assert!(console
            .ends_with("finding_count: 1\nBLOCK: actionable late review activity detected.\n"));

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join(REVIEW_SWEEP_REPORT_JSON)).expect("json"),
        )
        .expect("parse");
        assert_eq!(json["findings"][0]["pr_number"], 12);
        assert_eq!(json["findings"][0]["kind"], "risk_issue_comment");
        assert_eq!(json["tracking_issue"]["action"], "created");
        assert_eq!(json["states"][0], "closed");

        let markdown = render_sweep_markdown(&report);
        assert!(markdown.contains("- Tracking issue action: created"));
        assert!(
            markdown.contains("- Tracking issue URL: https://github.com/acme/widgets/issues/100")
        );
        assert!(
            markdown.contains("- PR #12 (MERGED) risk_issue_comment: risk keywords: regression")
        );
    }

    #[tokio::test]
    async fn functional_clean_sweep_passes_without_tracking_issue() {
        let remote = FakeRemote {
            recent: vec![recent(13, PullRequestState::Open)],
            ..FakeRemote::default()
        }
        .with_snapshots(13, vec![snapshot(13, PullRequestState::Open)]);
        let sleeper = RecordingSleeper::default();
        let temp = tempdir().expect("tempdir");
        let sink = DirectoryReportSink::new(temp.path());
        let config = ReviewConfig::default();
        let runtime = ReviewRuntime::new(&config, &remote, &remote, &sleeper, &FixedClock, &sink)
            .expect("runtime");
        let mut out = Vec::new();

        let report = run_review_sweep(&runtime, &mut out).await.expect("sweep");
        assert_eq!(report.status, ReviewStatus::Ok);
        assert_eq!(report.tracking_issue.action, TrackingIssueAction::None);
        assert!(console_text(&out).ends_with("OK: no actionable late review activity detected.\n"));
        assert!(render_sweep_markdown(&report).contains("## Findings\n- none"));
    }

    #[tokio::test]
    async fn regression_pull_request_listed_twice_is_swept_once() {
        let remote = FakeRemote {
            recent: vec![
                recent(12, PullRequestState::Merged),
                recent(12, PullRequestState::Merged),
            ],
            ..FakeRemote::default()
        }
        .with_snapshots(12, vec![merged_pr_with_late_comment()]);
        let sleeper = RecordingSleeper::default();
        let temp = tempdir().expect("tempdir");
        let sink = DirectoryReportSink::new(temp.path());
        let config = ReviewConfig::default();
        let runtime = ReviewRuntime::new(&config, &remote, &remote, &sleeper, &FixedClock, &sink)
            .expect("runtime");
        let mut out = Vec::new();

        let report = run_review_sweep(&runtime, &mut out).await.expect("sweep");

        assert_eq!(report.candidate_count, 1);
        assert_eq!(report.finding_count, 1);
        assert_eq!(
            report.findings[0].finding.url,
            "https://github.com/acme/widgets/pull/12#issuecomment-2"
        );
        assert_eq!(remote.fetch_count(), 1);
        assert!(console_text(&out).contains("candidate_prs: 1\n"));
    }

    #[test]
    fn unit_sweep_findings_are_unique_by_url_across_pull_requests() {
        let late = sweep_findings_for_pull_request(&merged_pr_with_late_comment(), &vocabulary());
        let mut findings = late.clone();
        findings.extend(late);
        let mut other = snapshot(14, PullRequestState::Open);
        other.comments = vec![comment("bob", "bug", "c14", "2026-03-03T00:00:00Z")];
        findings.extend(sweep_findings_for_pull_request(&other, &vocabulary()));

        let unique = deduplicate_sweep_findings(findings);
        let urls: Vec<&str> = unique.iter().map(|item| item.finding.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://github.com/acme/widgets/pull/12#issuecomment-2", "c14"]
        );
    }
}
