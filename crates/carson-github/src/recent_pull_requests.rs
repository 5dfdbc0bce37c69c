//! REST listing of pull requests updated inside the sweep window.

use std::collections::HashSet;

use carson_core::{format_rfc3339_seconds, parse_rfc3339_utc};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::github_client::{decode_json, strings};
use crate::pull_request::{PullRequestState, RecentPullRequest};
use crate::{GithubClient, GithubError};

const PULLS_PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct RestUser {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestPullRequest {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    closed_at: Option<String>,
    #[serde(default)]
    user: Option<RestUser>,
}

/// Maps REST `state` plus `merged_at` onto the GraphQL state vocabulary.
///
/// REST reports merged pull requests as `closed`; a non-blank `merged_at`
/// promotes them to [`PullRequestState::Merged`].
pub fn normalize_rest_pull_request_state(
    state: &str,
    merged_at: Option<&str>,
) -> Option<PullRequestState> {
    let base = PullRequestState::parse(state)?;
    let merged = merged_at.is_some_and(|value| !value.trim().is_empty());
    if base == PullRequestState::Closed && merged {
        return Some(PullRequestState::Merged);
    }
    Some(base)
}

impl GithubClient {
    /// Pull requests updated at or after `cutoff`, newest first.
    ///
    /// Paging stops on an empty page or after the first page that contains an
    /// item older than the cutoff. Items whose `updated_at` cannot be parsed
    /// are skipped. A pull request that shifts between pages while the listing
    /// is read is returned once, at its first position.
    pub async fn list_pull_requests_updated_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecentPullRequest>, GithubError> {
        let operation = "list pull requests for review sweep";
        let endpoint = format!("repos/{}/pulls", self.repo.as_slug());
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 1_usize;
        loop {
            if page > self.max_pages_per_connection {
                return Err(GithubError::ListingLimitExceeded {
                    listing: "pulls",
                    limit: self.max_pages_per_connection,
                });
            }
            let stdout = self
                .run_checked(
                    operation,
                    strings([
                        "api",
                        &endpoint,
                        "--method",
                        "GET",
                        "-f",
                        "state=all",
                        "-f",
                        "sort=updated",
                        "-f",
                        "direction=desc",
                        "-f",
                        &format!("per_page={PULLS_PER_PAGE}"),
                        "-f",
                        &format!("page={page}"),
                    ]),
                )
                .await?;
            let entries: Vec<RestPullRequest> = decode_json(operation, &stdout)?;
            if entries.is_empty() {
                break;
            }

            let mut reached_cutoff = false;
            for entry in entries {
                let Some(updated_at) = entry.updated_at.as_deref().and_then(parse_rfc3339_utc)
                else {
                    tracing::debug!(
                        number = entry.number,
                        "skipping pull request without updated_at"
                    );
                    continue;
                };
                if updated_at < cutoff {
                    reached_cutoff = true;
                    continue;
                }
                if !seen.insert(entry.number) {
                    tracing::debug!(number = entry.number, "skipping repeated pull request");
                    continue;
                }
                let raw_state = entry.state.as_deref().unwrap_or_default();
                let state = normalize_rest_pull_request_state(raw_state, entry.merged_at.as_deref())
                    .ok_or_else(|| {
                        GithubError::malformed(
                            operation,
                            format!(
                                "unknown state '{raw_state}' for pull request #{}",
                                entry.number
                            ),
                        )
                    })?;
                results.push(RecentPullRequest {
                    number: entry.number,
                    title: entry.title.unwrap_or_default(),
                    url: entry.html_url.unwrap_or_default(),
                    state,
                    updated_at: format_rfc3339_seconds(updated_at),
                    merged_at: non_blank(entry.merged_at),
                    closed_at: non_blank(entry.closed_at),
                    author: entry.user.and_then(|user| user.login).unwrap_or_default(),
                });
            }
            tracing::debug!(page, collected = results.len(), "pull request listing page read");
            if reached_cutoff {
                break;
            }
            page += 1;
        }
        Ok(results)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
