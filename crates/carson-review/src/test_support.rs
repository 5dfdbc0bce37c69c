use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use carson_github::{
    GithubError, IssueState, IssueTracker, PullRequestSnapshot, PullRequestSource,
    PullRequestSummary, RecentPullRequest, TrackingIssueState,
};
use chrono::{DateTime, Utc};

use crate::review_convergence::PollSleeper;

/// In-memory pull request source and issue tracker.
#[derive(Default)]
pub(crate) struct FakeRemote {
    pub(crate) branch_pull_request: Option<PullRequestSummary>,
    pub(crate) recent: Vec<RecentPullRequest>,
    pub(crate) snapshots: Mutex<HashMap<u64, VecDeque<PullRequestSnapshot>>>,
    pub(crate) issues: Mutex<Vec<TrackingIssueState>>,
    pub(crate) hide_created_issue: bool,
    pub(crate) fail_fetch: bool,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) listed_cutoffs: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeRemote {
    /// Queues snapshots for one pull request; the last one repeats once the queue drains.
    pub(crate) fn with_snapshots(self, number: u64, snapshots: Vec<PullRequestSnapshot>) -> Self {
        self.snapshots
            .lock()
            .expect("snapshots lock")
            .insert(number, snapshots.into());
        self
    }

    pub(crate) fn with_issue(self, issue: TrackingIssueState) -> Self {
        self.issues.lock().expect("issues lock").push(issue);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("fetch "))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn set_issue_state(&self, number: u64, state: IssueState) {
        let mut issues = self.issues.lock().expect("issues lock");
        if let Some(issue) = issues.iter_mut().find(|issue| issue.number == number) {
            issue.state = state;
        }
    }
}

#[async_trait]
impl PullRequestSource for FakeRemote {
    async fn pull_request_for_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequestSummary>, GithubError> {
        self.record(format!("branch {branch}"));
        Ok(self.branch_pull_request.clone())
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot, GithubError> {
        self.record(format!("fetch {number}"));
        if self.fail_fetch {
            return Err(GithubError::PaginationLimitExceeded {
                connection: "comments",
                number,
                limit: 50,
            });
        }
        let mut snapshots = self.snapshots.lock().expect("snapshots lock");
        let queue = snapshots
            .get_mut(&number)
            .ok_or(GithubError::PullRequestNotFound(number))?;
        if queue.len() > 1 {
            return queue.pop_front().ok_or(GithubError::PullRequestNotFound(number));
        }
        queue
            .front()
            .cloned()
            .ok_or(GithubError::PullRequestNotFound(number))
    }

    async fn list_recent_pull_requests(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecentPullRequest>, GithubError> {
        self.record("list".to_string());
        self.listed_cutoffs.lock().expect("cutoff lock").push(cutoff);
        Ok(self.recent.clone())
    }
}

#[async_trait]
impl IssueTracker for FakeRemote {
    async fn ensure_label(
        &self,
        label: &str,
        description: &str,
        color: &str,
    ) -> Result<(), GithubError> {
        self.record(format!("label {label} {description} {color}"));
        Ok(())
    }

    async fn find_issue_by_title(
        &self,
        title: &str,
    ) -> Result<Option<TrackingIssueState>, GithubError> {
        self.record("find".to_string());
        Ok(self
            .issues
            .lock()
            .expect("issues lock")
            .iter()
            .find(|issue| issue.title == title)
            .cloned())
    }

    async fn create_issue(&self, title: &str, body: &str, label: &str) -> Result<(), GithubError> {
        self.record(format!("create {label}\n{body}"));
        if !self.hide_created_issue {
            let mut issues = self.issues.lock().expect("issues lock");
            let number = 100 + issues.len() as u64;
            issues.push(TrackingIssueState {
                number,
                title: title.to_string(),
                state: IssueState::Open,
                url: format!("https://github.com/acme/widgets/issues/{number}"),
            });
        }
        Ok(())
    }

    async fn reopen_issue(&self, number: u64) -> Result<(), GithubError> {
        self.record(format!("reopen {number}"));
        self.set_issue_state(number, IssueState::Open);
        Ok(())
    }

    async fn edit_issue(
        &self,
        number: u64,
        _title: &str,
        body: &str,
        label: &str,
    ) -> Result<(), GithubError> {
        self.record(format!("edit {number} {label}\n{body}"));
        Ok(())
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), GithubError> {
        self.record(format!("comment {number} {body}"));
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<(), GithubError> {
        self.record(format!("close {number}"));
        self.set_issue_state(number, IssueState::Closed);
        Ok(())
    }
}

/// Records requested sleeps without waiting.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    pub(crate) sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn seconds(&self) -> Vec<u64> {
        self.sleeps
            .lock()
            .expect("sleeps lock")
            .iter()
            .map(Duration::as_secs)
            .collect()
    }
}

#[async_trait]
impl PollSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("sleeps lock").push(duration);
    }
}

pub(crate) fn console_text(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).to_string()
}
