//! Remote seams consumed by the review engine.
//!
//! The gate and sweep only see these traits, so tests can drive them with
//! in-memory fakes while production wires in [`GithubClient`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::pull_request::{
    PullRequestSnapshot, PullRequestSummary, RecentPullRequest, TrackingIssueState,
};
use crate::{GithubClient, GithubError};

#[async_trait]
/// Read access to pull requests.
pub trait PullRequestSource: Send + Sync {
    /// Pull request whose head is `branch`, if any.
    async fn pull_request_for_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequestSummary>, GithubError>;

    /// Fully paginated snapshot of pull request `number`.
    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot, GithubError>;

    /// Pull requests updated at or after `cutoff`, newest first.
    async fn list_recent_pull_requests(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecentPullRequest>, GithubError>;
}

#[async_trait]
/// Issue and label writes needed by the tracking issue reconciler.
pub trait IssueTracker: Send + Sync {
    async fn ensure_label(
        &self,
        label: &str,
        description: &str,
        color: &str,
    ) -> Result<(), GithubError>;
    async fn find_issue_by_title(
        &self,
        title: &str,
    ) -> Result<Option<TrackingIssueState>, GithubError>;
    async fn create_issue(&self, title: &str, body: &str, label: &str) -> Result<(), GithubError>;
    async fn reopen_issue(&self, number: u64) -> Result<(), GithubError>;
    async fn edit_issue(
        &self,
        number: u64,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<(), GithubError>;
    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), GithubError>;
    async fn close_issue(&self, number: u64) -> Result<(), GithubError>;
}

#[async_trait]
impl PullRequestSource for GithubClient {
    async fn pull_request_for_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequestSummary>, GithubError> {
        self.find_pull_request_for_branch(branch).await
    }

    async fn fetch_pull_request(&self, number: u64) -> Result<PullRequestSnapshot, GithubError> {
        self.read_pull_request_snapshot(number).await
    }

    async fn list_recent_pull_requests(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecentPullRequest>, GithubError> {
        self.list_pull_requests_updated_since(cutoff).await
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn ensure_label(
        &self,
        label: &str,
        description: &str,
        color: &str,
    ) -> Result<(), GithubError> {
        self.upsert_label(label, description, color).await
    }

    async fn find_issue_by_title(
        &self,
        title: &str,
    ) -> Result<Option<TrackingIssueState>, GithubError> {
        self.find_issue_with_title(title).await
    }

    async fn create_issue(&self, title: &str, body: &str, label: &str) -> Result<(), GithubError> {
        self.create_labeled_issue(title, body, label).await
    }

    async fn reopen_issue(&self, number: u64) -> Result<(), GithubError> {
        self.set_issue_open(number, true).await
    }

    async fn edit_issue(
        &self,
        number: u64,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<(), GithubError> {
        self.edit_labeled_issue(number, title, body, label).await
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), GithubError> {
        self.add_issue_comment(number, body).await
    }

    async fn close_issue(&self, number: u64) -> Result<(), GithubError> {
        self.set_issue_open(number, false).await
    }
}
