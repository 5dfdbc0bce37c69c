use std::{collections::HashMap, fs, sync::Mutex, time::Duration};

use async_trait::async_trait;
use carson_github::{
    GithubError, IssueState, IssueTracker, PullRequestComment, PullRequestReview,
    PullRequestSnapshot, PullRequestSource, PullRequestState, PullRequestSummary,
    RecentPullRequest, ReviewThread, TrackingIssueState,
};
use carson_review::{
    run_review_gate, run_review_sweep, DirectoryReportSink, GateRequest, PollSleeper,
    ReviewClock, ReviewConfig, ReviewRuntime, ReviewStatus, TrackingIssueAction, EXIT_BLOCK,
    EXIT_OK,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

const PR_URL: &str = "https://github.com/acme/widgets/pull/7";

struct InMemoryGithub {
    branch_pull_request: Option<PullRequestSummary>,
    snapshots: HashMap<u64, PullRequestSnapshot>,
    recent: Vec<RecentPullRequest>,
    issues: Mutex<Vec<(TrackingIssueState, String)>>,
    labels: Mutex<Vec<String>>,
}

impl InMemoryGithub {
    fn new(snapshots: Vec<PullRequestSnapshot>) -> Self {
        let branch_pull_request = snapshots.first().map(PullRequestSnapshot::summary);
        Self {
            branch_pull_request,
            snapshots: snapshots
                .into_iter()
                .map(|snapshot| (snapshot.number, snapshot))
                .collect(),
            recent: Vec::new(),
            issues: Mutex::new(Vec::new()),
            labels: Mutex::new(Vec::new()),
        }
    }

    fn with_recent(mut self, recent: Vec<RecentPullRequest>) -> Self {
        self.recent = recent;
        self
    }

    fn issue_bodies(&self) -> Vec<String> {
        self.issues
            .lock()
            .expect("issues lock")
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl PullRequestSource for InMemoryGithub {
    async fn pull_request_for_branch(
        &self,
        _branch: &str,
    ) -> Result<Option<PullRequestSummary>, GithubError> {
        Ok(self.branch_pull_request.clone())
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot, GithubError> {
        self.snapshots
            .get(&number)
            .cloned()
            .ok_or(GithubError::PullRequestNotFound(number))
    }

    async fn list_recent_pull_requests(
        &self,
        _cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecentPullRequest>, GithubError> {
        Ok(self.recent.clone())
    }
}

#[async_trait]
impl IssueTracker for InMemoryGithub {
    async fn ensure_label(
        &self,
        label: &str,
        _description: &str,
        _color: &str,
    ) -> Result<(), GithubError> {
        self.labels
            .lock()
            .expect("labels lock")
            .push(label.to_string());
        Ok(())
    }

    async fn find_issue_by_title(
        &self,
        title: &str,
    ) -> Result<Option<TrackingIssueState>, GithubError> {
        Ok(self
            .issues
            .lock()
            .expect("issues lock")
            .iter()
            .map(|(issue, _)| issue)
            .find(|issue| issue.title == title)
            .cloned())
    }

    async fn create_issue(&self, title: &str, body: &str, _label: &str) -> Result<(), GithubError> {
        let mut issues = self.issues.lock().expect("issues lock");
        let number = 40 + issues.len() as u64;
        issues.push((
            TrackingIssueState {
                number,
                title: title.to_string(),
                state: IssueState::Open,
                url: format!("https://github.com/acme/widgets/issues/{number}"),
            },
            body.to_string(),
        ));
        Ok(())
    }

    async fn reopen_issue(&self, number: u64) -> Result<(), GithubError> {
        self.set_state(number, IssueState::Open);
        Ok(())
    }

    async fn edit_issue(
        &self,
        number: u64,
        _title: &str,
        body: &str,
        _label: &str,
    ) -> Result<(), GithubError> {
        let mut issues = self.issues.lock().expect("issues lock");
        if let Some((_, existing)) = issues.iter_mut().find(|(issue, _)| issue.number == number) {
            *existing = body.to_string();
        }
        Ok(())
    }

    async fn comment_on_issue(&self, _number: u64, _body: &str) -> Result<(), GithubError> {
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GithubError> {
        self.set_state(number, IssueState::Closed);
        Ok(())
    }
}

impl InMemoryGithub {
    fn set_state(&self, number: u64, state: IssueState) {
        let mut issues = self.issues.lock().expect("issues lock");
        if let Some((issue, _)) = issues.iter_mut().find(|(issue, _)| issue.number == number) {
            issue.state = state;
        }
    }
}

#[derive(Default)]
struct NoopSleeper {
    slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl PollSleeper for NoopSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().expect("sleep lock").push(duration);
    }
}

struct FixedClock(DateTime<Utc>);

impl ReviewClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn comment(author: &str, body: &str, url: &str, created_at: &str) -> PullRequestComment {
    PullRequestComment {
        author: author.to_string(),
        body: body.to_string(),
        url: url.to_string(),
        created_at: created_at.to_string(),
    }
}

fn snapshot(number: u64, state: PullRequestState) -> PullRequestSnapshot {
    PullRequestSnapshot {
        number,
        title: "Add widget cache".to_string(),
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        state,
        updated_at: "2026-03-01T10:00:00Z".to_string(),
        merged_at: None,
        closed_at: None,
        author: "alice".to_string(),
        comments: Vec::new(),
        reviews: Vec::new(),
        review_threads: Vec::new(),
    }
}

fn quick_config() -> ReviewConfig {
    ReviewConfig {
        wait_seconds: 0,
        poll_seconds: 1,
        max_polls: 3,
        ..ReviewConfig::default()
    }
}

fn read_json(path: &std::path::Path) -> Value {
    let raw = fs::read_to_string(path).expect("report should exist");
    serde_json::from_str(&raw).expect("report should be json")
}

#[tokio::test]
async fn integration_gate_blocks_on_single_unresolved_thread() {
    let mut pr = snapshot(7, PullRequestState::Open);
    pr.review_threads.push(ReviewThread {
        is_resolved: false,
        is_outdated: false,
        comments: vec![comment(
            "bob",
            "cache key ignores locale",
            &format!("{PR_URL}#discussion_r11"),
            "2026-03-01T09:00:00Z",
        )],
    });
    let github = InMemoryGithub::new(vec![pr]);
    let sleeper = NoopSleeper::default();
    let clock = FixedClock(fixed_now());
    let reports_dir = tempfile::tempdir().expect("tempdir");
    let reports = DirectoryReportSink::new(reports_dir.path());
    let config = quick_config();
    let runtime = ReviewRuntime::new(&config, &github, &github, &sleeper, &clock, &reports)
        .expect("runtime");

    let mut out = Vec::new();
    let report = run_review_gate(
        &runtime,
        &GateRequest {
            branch: "feature/cache".to_string(),
            pr_number: None,
        },
        &mut out,
    )
    .await
    .expect("gate should run");

    assert_eq!(report.status, ReviewStatus::Block);
    assert_eq!(report.status.exit_code(), EXIT_BLOCK);
    assert!(report.converged);
    assert_eq!(
        report.block_reasons,
        vec!["unresolved review threads remain (1)".to_string()]
    );
    let json = read_json(&reports_dir.path().join("review_gate_latest.json"));
    assert_eq!(json["block_reasons"][0], "unresolved review threads remain (1)");
    assert_eq!(json["pr"]["number"], 7);
    let console = String::from_utf8(out).expect("utf-8 console");
    assert!(console.contains("BLOCK: unresolved review threads remain (1)"));
}

#[tokio::test]
async fn integration_gate_passes_when_changes_request_is_acknowledged() {
    let review_url = format!("{PR_URL}#pullrequestreview-21");
    let mut pr = snapshot(7, PullRequestState::Open);
    pr.reviews.push(PullRequestReview {
        author: "bob".to_string(),
        state: "CHANGES_REQUESTED".to_string(),
        body: "Please split the cache eviction change".to_string(),
        url: review_url.clone(),
        created_at: "2026-03-01T09:00:00Z".to_string(),
    });
    pr.comments.push(comment(
        "alice",
        &format!("Disposition: accepted, split into a follow-up commit. {review_url}"),
        &format!("{PR_URL}#issuecomment-31"),
        "2026-03-01T09:30:00Z",
    ));
    let github = InMemoryGithub::new(vec![pr]);
    let sleeper = NoopSleeper::default();
    let clock = FixedClock(fixed_now());
    let reports_dir = tempfile::tempdir().expect("tempdir");
    let reports = DirectoryReportSink::new(reports_dir.path());
    let config = quick_config();
    let runtime = ReviewRuntime::new(&config, &github, &github, &sleeper, &clock, &reports)
        .expect("runtime");

    let mut out = Vec::new();
    let report = run_review_gate(
        &runtime,
        &GateRequest {
            branch: "feature/cache".to_string(),
            pr_number: Some(7),
        },
        &mut out,
    )
    .await
    .expect("gate should run");

    assert_eq!(report.status.exit_code(), EXIT_OK);
    assert!(report.converged);
    assert_eq!(report.actionable_top_level.len(), 1);
    assert!(report.unacknowledged_actionable.is_empty());
    assert!(report.block_reasons.is_empty());
    assert_eq!(
        sleeper.slept.lock().expect("sleep lock").as_slice(),
        &[Duration::from_secs(1)]
    );
    let console = String::from_utf8(out).expect("utf-8 console");
    assert!(console.trim_end().ends_with("OK: review gate passed."));
}

#[tokio::test]
async fn integration_sweep_reports_late_risk_comment_and_creates_tracking_issue() {
    let late_url = format!("{PR_URL}#issuecomment-51");
    let mut pr = snapshot(7, PullRequestState::Merged);
    pr.merged_at = Some("2026-03-01T08:00:00Z".to_string());
    pr.closed_at = Some("2026-03-01T08:00:00Z".to_string());
    pr.comments.push(comment(
        "bob",
        "Early note before merge: possible bug in eviction",
        &format!("{PR_URL}#issuecomment-50"),
        "2026-03-01T07:00:00Z",
    ));
    pr.comments.push(comment(
        "bob",
        "This introduced a regression in the widget cache",
        &late_url,
        "2026-03-01T09:00:00Z",
    ));
    let recent = vec![RecentPullRequest {
        number: 7,
        title: pr.title.clone(),
        url: pr.url.clone(),
        state: PullRequestState::Merged,
        updated_at: "2026-03-01T09:00:00Z".to_string(),
        merged_at: pr.merged_at.clone(),
        closed_at: pr.closed_at.clone(),
        author: "alice".to_string(),
    }];
    let github = InMemoryGithub::new(vec![pr]).with_recent(recent);
    let sleeper = NoopSleeper::default();
    let clock = FixedClock(fixed_now());
    let reports_dir = tempfile::tempdir().expect("tempdir");
    let reports = DirectoryReportSink::new(reports_dir.path());
    let config = ReviewConfig::default();
    let runtime = ReviewRuntime::new(&config, &github, &github, &sleeper, &clock, &reports)
        .expect("runtime");

    let mut out = Vec::new();
    let report = run_review_sweep(&runtime, &mut out)
        .await
        .expect("sweep should run");

    assert_eq!(report.window_days, 3);
    assert_eq!(report.candidate_count, 1);
    assert_eq!(report.finding_count, 1);
    assert_eq!(report.findings[0].finding.url, late_url);
    assert_eq!(report.status.exit_code(), EXIT_BLOCK);
    assert_eq!(report.tracking_issue.action, TrackingIssueAction::Created);
    assert_eq!(report.cutoff_time, "2026-02-27T12:00:00Z");

    let bodies = github.issue_bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains(&late_url));
    assert!(!bodies[0].contains("issuecomment-50"));
    assert_eq!(
        github.labels.lock().expect("labels lock").as_slice(),
        &["carson-review-sweep".to_string()]
    );

    let json = read_json(&reports_dir.path().join("review_sweep_latest.json"));
    assert_eq!(json["finding_count"], 1);
    assert_eq!(json["tracking_issue"]["action"], "created");
    assert_eq!(json["states"], serde_json::json!(["open", "closed"]));
    let console = String::from_utf8(out).expect("utf-8 console");
    assert!(console.contains("BLOCK: actionable late review activity detected."));
}
