//! Repository coordinates and local git context for review commands.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::{CommandRunner, GithubError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parses an `owner/repo` slug.
    pub fn parse(raw: &str) -> Result<Self, GithubError> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| GithubError::InvalidRepository(raw.to_string()))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(GithubError::InvalidRepository(raw.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Extracts owner/repo from ssh, scp-style, or https git remote URLs.
    pub fn from_remote_url(remote_url: &str) -> Option<Self> {
        static REMOTE_URL: OnceLock<Regex> = OnceLock::new();
        let pattern = REMOTE_URL.get_or_init(|| {
            Regex::new(
                r"^(?:git@|https?://|ssh://git@)?[^/:]+[:/](?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$",
            )
            .expect("remote url pattern is valid")
        });
        let captures = pattern.captures(remote_url.trim())?;
        Some(Self {
            owner: captures["owner"].to_string(),
            name: captures["repo"].to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Resolves repository coordinates from the configured git remote, falling
/// back to `gh repo view` when the remote URL is not a recognizable form.
pub async fn locate_repository(
    git: &dyn CommandRunner,
    gh: &dyn CommandRunner,
    remote_name: &str,
) -> Result<RepoRef, GithubError> {
    let remote_key = format!("remote.{remote_name}.url");
    let output = git
        .run(&["config".to_string(), "--get".to_string(), remote_key])
        .await?;
    let remote_url = output.stdout.trim().to_string();
    if output.success {
        if let Some(repo) = RepoRef::from_remote_url(&remote_url) {
            return Ok(repo);
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RepoView {
        name_with_owner: String,
    }

    let view = gh
        .run(&[
            "repo".to_string(),
            "view".to_string(),
            "--json".to_string(),
            "nameWithOwner".to_string(),
        ])
        .await?;
    if view.success {
        if let Ok(parsed) = serde_json::from_str::<RepoView>(&view.stdout) {
            if let Ok(repo) = RepoRef::parse(&parsed.name_with_owner) {
                return Ok(repo);
            }
        }
    }
    Err(GithubError::CommandFailed {
        operation: "resolve repository".to_string(),
        detail: format!(
            "unable to parse owner/repo from remote {remote_name} ({})",
            if remote_url.is_empty() {
                "no url"
            } else {
                remote_url.as_str()
            }
        ),
    })
}

/// Current local branch name (`git rev-parse --abbrev-ref HEAD`).
pub async fn current_branch(git: &dyn CommandRunner) -> Result<String, GithubError> {
    let output = git
        .run(&[
            "rev-parse".to_string(),
            "--abbrev-ref".to_string(),
            "HEAD".to_string(),
        ])
        .await?;
    if !output.success {
        return Err(GithubError::CommandFailed {
            operation: "git rev-parse --abbrev-ref HEAD".to_string(),
            detail: output.error_text("unable to read current branch"),
        });
    }
    Ok(output.stdout.trim().to_string())
}
