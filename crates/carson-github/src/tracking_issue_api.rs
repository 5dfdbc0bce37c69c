//! Label and issue operations used by the sweep tracking issue.

use serde::Deserialize;

use crate::github_client::{decode_json, strings};
use crate::pull_request::{IssueState, TrackingIssueState};
use crate::{GithubClient, GithubError};

const ISSUE_LIST_LIMIT: &str = "100";

#[derive(Debug, Deserialize)]
struct IssueListEntry {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    url: String,
}

impl GithubClient {
    /// Creates the label, or updates its description and color when it exists.
    pub async fn upsert_label(
        &self,
        label: &str,
        description: &str,
        color: &str,
    ) -> Result<(), GithubError> {
        self.run_checked(
            &format!("ensure label {label}"),
            strings([
                "label",
                "create",
                label,
                "--repo",
                &self.repo.as_slug(),
                "--description",
                description,
                "--color",
                color,
                "--force",
            ]),
        )
        .await?;
        Ok(())
    }

    /// Issue whose title equals `title` exactly, among the most recent issues of any state.
    pub async fn find_issue_with_title(
        &self,
        title: &str,
    ) -> Result<Option<TrackingIssueState>, GithubError> {
        let operation = "list issues";
        let stdout = self
            .run_checked(
                operation,
                strings([
                    "issue",
                    "list",
                    "--repo",
                    &self.repo.as_slug(),
                    "--state",
                    "all",
                    "--limit",
                    ISSUE_LIST_LIMIT,
                    "--json",
                    "number,title,state,url",
                ]),
            )
            .await?;
        let entries: Vec<IssueListEntry> = decode_json(operation, &stdout)?;
        let Some(entry) = entries.into_iter().find(|entry| entry.title == title) else {
            return Ok(None);
        };
        let state = IssueState::parse(&entry.state).ok_or_else(|| {
            GithubError::malformed(
                operation,
                format!("unknown state '{}' for issue #{}", entry.state, entry.number),
            )
        })?;
        Ok(Some(TrackingIssueState {
            number: entry.number,
            title: entry.title,
            state,
            url: entry.url,
        }))
    }

    pub async fn create_labeled_issue(
        &self,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<(), GithubError> {
        self.run_checked(
            "create tracking issue",
            strings([
                "issue",
                "create",
                "--repo",
                &self.repo.as_slug(),
                "--title",
                title,
                "--body",
                body,
                "--label",
                label,
            ]),
        )
        .await?;
        Ok(())
    }

    /// Replaces title and body, adding `label` if missing.
    pub async fn edit_labeled_issue(
        &self,
        number: u64,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<(), GithubError> {
        self.run_checked(
            &format!("edit issue #{number}"),
            strings([
                "issue",
                "edit",
                &number.to_string(),
                "--repo",
                &self.repo.as_slug(),
                "--title",
                title,
                "--body",
                body,
                "--add-label",
                label,
            ]),
        )
        .await?;
        Ok(())
    }

    pub async fn add_issue_comment(&self, number: u64, body: &str) -> Result<(), GithubError> {
        self.run_checked(
            &format!("comment on issue #{number}"),
            strings([
                "issue",
                "comment",
                &number.to_string(),
                "--repo",
                &self.repo.as_slug(),
                "--body",
                body,
            ]),
        )
        .await?;
        Ok(())
    }

    pub async fn set_issue_open(&self, number: u64, open: bool) -> Result<(), GithubError> {
        let verb = if open { "reopen" } else { "close" };
        self.run_checked(
            &format!("{verb} issue #{number}"),
            strings([
                "issue",
                verb,
                &number.to_string(),
                "--repo",
                &self.repo.as_slug(),
            ]),
        )
        .await?;
        Ok(())
    }
}
