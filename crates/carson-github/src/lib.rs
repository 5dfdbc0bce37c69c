//! GitHub access layer for Carson review commands.
//!
//! Wraps the `gh` CLI behind a [`CommandRunner`](gh_command::CommandRunner),
//! decodes GraphQL/REST payloads into typed pull request snapshots, paginates
//! every review connection to completion, and exposes the issue operations the
//! sweep tracking issue needs.

pub mod gh_command;
pub mod github_client;
pub mod github_error;
pub mod graphql_schema;
pub mod pull_request;
pub mod pull_request_reader;
pub mod recent_pull_requests;
pub mod repository;
pub mod review_remote;
pub mod tracking_issue_api;

pub use gh_command::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use github_client::GithubClient;
pub use github_error::GithubError;
pub use pull_request::{
    IssueState, PullRequestComment, PullRequestReview, PullRequestSnapshot, PullRequestState,
    PullRequestSummary, RecentPullRequest, ReviewThread, TrackingIssueState,
};
pub use pull_request_reader::MAX_PAGES_PER_CONNECTION;
pub use repository::RepoRef;
pub use review_remote::{IssueTracker, PullRequestSource};

#[cfg(test)]
pub(crate) mod test_support;
