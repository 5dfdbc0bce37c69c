use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::gh_command::truncate_for_error;
use crate::pull_request::{PullRequestState, PullRequestSummary};
use crate::{CommandRunner, GithubError, RepoRef};

/// GitHub client for one repository, backed by the `gh` CLI session.
#[derive(Clone)]
pub struct GithubClient {
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) repo: RepoRef,
    pub(crate) max_pages_per_connection: usize,
}

impl GithubClient {
    pub fn new(runner: Arc<dyn CommandRunner>, repo: RepoRef) -> Self {
        Self {
            runner,
            repo,
            max_pages_per_connection: crate::MAX_PAGES_PER_CONNECTION,
        }
    }

    /// Overrides the per-connection page safety bound.
    pub fn with_max_pages_per_connection(mut self, max_pages: usize) -> Self {
        self.max_pages_per_connection = max_pages.max(1);
        self
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Fails with [`GithubError::CommandUnavailable`] when `gh` cannot run.
    pub async fn ensure_available(&self) -> Result<(), GithubError> {
        let output = self.runner.run(&["--version".to_string()]).await?;
        if !output.success {
            return Err(GithubError::CommandUnavailable {
                program: "gh".to_string(),
                message: output.error_text("gh --version failed"),
            });
        }
        Ok(())
    }

    /// Pull request for `branch`, or `None` when GitHub reports no pull request.
    pub async fn find_pull_request_for_branch(
        &self,
        branch: &str,
    ) -> Result<Option<PullRequestSummary>, GithubError> {
        #[derive(Deserialize)]
        struct PullRequestView {
            number: u64,
            title: String,
            url: String,
            state: String,
        }

        let operation = format!("read pull request for branch {branch}");
        let output = self
            .runner
            .run(&strings([
                "pr",
                "view",
                "--repo",
                &self.repo.as_slug(),
                "--json",
                "number,title,url,state",
                "--",
                branch,
            ]))
            .await?;
        if !output.success {
            let detail = output.error_text(&format!("unable to read PR for branch {branch}"));
            if detail.to_ascii_lowercase().contains("no pull requests found") {
                return Ok(None);
            }
            return Err(GithubError::CommandFailed { operation, detail });
        }
        let view: PullRequestView = decode_json(&operation, &output.stdout)?;
        let state = PullRequestState::parse(&view.state).ok_or_else(|| {
            GithubError::malformed(&operation, format!("unknown state '{}'", view.state))
        })?;
        Ok(Some(PullRequestSummary {
            number: view.number,
            title: view.title,
            url: view.url,
            state,
        }))
    }

    /// Runs `gh` and returns stdout, mapping a non-zero exit to [`GithubError::CommandFailed`].
    pub(crate) async fn run_checked(
        &self,
        operation: &str,
        args: Vec<String>,
    ) -> Result<String, GithubError> {
        tracing::debug!(operation, "gh request");
        let output = self.runner.run(&args).await?;
        if !output.success {
            return Err(GithubError::CommandFailed {
                operation: operation.to_string(),
                detail: output.error_text(&format!("unable to {operation}")),
            });
        }
        Ok(output.stdout)
    }

    pub(crate) fn graphql_args(
        &self,
        query: &str,
        number: u64,
        after: Option<&str>,
    ) -> Vec<String> {
        let mut args = strings([
            "api",
            "graphql",
            "-f",
            &format!("query={query}"),
            "-F",
            &format!("owner={}", self.repo.owner),
            "-F",
            &format!("repo={}", self.repo.name),
            "-F",
            &format!("number={number}"),
        ]);
        if let Some(after) = after {
            args.push("-f".to_string());
            args.push(format!("after={after}"));
        }
        args
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(
    operation: &str,
    raw: &str,
) -> Result<T, GithubError> {
    serde_json::from_str(raw).map_err(|error| {
        GithubError::malformed(
            operation,
            format!("{error}; payload: {}", truncate_for_error(raw.trim(), 240)),
        )
    })
}

pub(crate) fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
