//! Fully paginated pull request snapshot reads.

use crate::github_client::decode_json;
use crate::graphql_schema::{
    actor_login, CommentNode, ConnectionNode, GraphqlResponse, PullRequestConnection,
    PullRequestNode, PullRequestPageNode, RepositoryData, ReviewNode, ReviewThreadNode,
    PULL_REQUEST_DETAILS_QUERY,
};
use crate::pull_request::{
    PullRequestComment, PullRequestReview, PullRequestSnapshot, PullRequestState, ReviewThread,
};
use crate::{GithubClient, GithubError};

/// Upper bound on pages read per connection, counting the first page.
pub const MAX_PAGES_PER_CONNECTION: usize = 50;

impl GithubClient {
    /// Reads pull request metadata plus every comment, review, and review thread.
    ///
    /// Any failure while paginating aborts the whole read; callers never see a
    /// partially populated snapshot.
    pub async fn read_pull_request_snapshot(
        &self,
        number: u64,
    ) -> Result<PullRequestSnapshot, GithubError> {
        let operation = format!("read pull request #{number}");
        let stdout = self
            .run_checked(
                &operation,
                self.graphql_args(PULL_REQUEST_DETAILS_QUERY, number, None),
            )
            .await?;
        let mut node: PullRequestNode = decode_pull_request_payload(&operation, &stdout)?
            .ok_or(GithubError::PullRequestNotFound(number))?;

        let threads = self
            .collect_connection(
                number,
                PullRequestConnection::ReviewThreads,
                node.review_threads.take(),
                |page| page.review_threads,
            )
            .await?;
        let comments = self
            .collect_connection(
                number,
                PullRequestConnection::Comments,
                node.comments.take(),
                |page| page.comments,
            )
            .await?;
        let reviews = self
            .collect_connection(
                number,
                PullRequestConnection::Reviews,
                node.reviews.take(),
                |page| page.reviews,
            )
            .await?;

        let state = PullRequestState::parse(&node.state).ok_or_else(|| {
            GithubError::malformed(&operation, format!("unknown state '{}'", node.state))
        })?;
        tracing::debug!(
            number,
            comments = comments.len(),
            reviews = reviews.len(),
            review_threads = threads.len(),
            "pull request snapshot read"
        );
        Ok(PullRequestSnapshot {
            number: node.number,
            title: node.title,
            url: node.url,
            state,
            updated_at: node.updated_at,
            merged_at: non_blank(node.merged_at),
            closed_at: non_blank(node.closed_at),
            author: actor_login(node.author),
            comments: comments.into_iter().map(comment_from_node).collect(),
            reviews: reviews.into_iter().map(review_from_node).collect(),
            review_threads: threads.into_iter().map(thread_from_node).collect(),
        })
    }

    async fn collect_connection<T, F>(
        &self,
        number: u64,
        connection: PullRequestConnection,
        first_page: Option<ConnectionNode<T>>,
        extract: F,
    ) -> Result<Vec<T>, GithubError>
    where
        T: serde::de::DeserializeOwned + Send,
        F: Fn(PullRequestPageNode) -> Option<ConnectionNode<T>> + Send + Sync,
    {
        let Some(first_page) = first_page else {
            return Ok(Vec::new());
        };
        let (mut page_info, mut items) = first_page.into_parts();
        let mut pages_read = 1_usize;
        while let Some(cursor) = page_info.next_cursor().map(str::to_string) {
            if pages_read >= self.max_pages_per_connection {
                return Err(GithubError::PaginationLimitExceeded {
                    connection: connection.graphql_name(),
                    number,
                    limit: self.max_pages_per_connection,
                });
            }
            let page = self.read_connection_page(number, connection, &cursor).await?;
            let connection_page = extract(page).ok_or(GithubError::MissingConnection {
                connection: connection.graphql_name(),
                number,
            })?;
            pages_read = pages_read.saturating_add(1);
            let (next_page_info, page_items) = connection_page.into_parts();
            tracing::debug!(
                number,
                connection = connection.graphql_name(),
                page = pages_read,
                items = page_items.len(),
                "connection page read"
            );
            items.extend(page_items);
            page_info = next_page_info;
        }
        Ok(items)
    }

    async fn read_connection_page(
        &self,
        number: u64,
        connection: PullRequestConnection,
        cursor: &str,
    ) -> Result<PullRequestPageNode, GithubError> {
        let operation = format!(
            "paginate pull request #{number} {}",
            connection.graphql_name()
        );
        let stdout = self
            .run_checked(
                &operation,
                self.graphql_args(connection.page_query(), number, Some(cursor)),
            )
            .await?;
        let page: PullRequestPageNode = decode_pull_request_payload(&operation, &stdout)?.ok_or(
            GithubError::PullRequestMissingDuringPagination {
                connection: connection.graphql_name(),
                number,
            },
        )?;
        if page.number != Some(number) {
            return Err(GithubError::PullRequestMismatch {
                connection: connection.graphql_name(),
                expected: number,
                found: page
                    .number
                    .map(|found| format!("pull request #{found}"))
                    .unwrap_or_else(|| "no pull request number".to_string()),
            });
        }
        Ok(page)
    }
}

fn decode_pull_request_payload<T: serde::de::DeserializeOwned>(
    operation: &str,
    raw: &str,
) -> Result<Option<T>, GithubError> {
    let response: GraphqlResponse<RepositoryData<T>> = decode_json(operation, raw)?;
    if response.data.is_none() && !response.errors.is_empty() {
        return Err(GithubError::GraphqlErrors {
            operation: operation.to_string(),
            messages: response
                .errors
                .iter()
                .map(|entry| entry.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        });
    }
    Ok(response
        .data
        .and_then(|data| data.repository)
        .and_then(|repository| repository.pull_request))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn comment_from_node(node: CommentNode) -> PullRequestComment {
    PullRequestComment {
        author: actor_login(node.author),
        body: node.body.unwrap_or_default(),
        url: node.url.unwrap_or_default(),
        created_at: node.created_at.unwrap_or_default(),
    }
}

fn review_from_node(node: ReviewNode) -> PullRequestReview {
    PullRequestReview {
        author: actor_login(node.author),
        state: node.state.unwrap_or_default().to_ascii_uppercase(),
        body: node.body.unwrap_or_default(),
        url: node.url.unwrap_or_default(),
        created_at: node.submitted_at.unwrap_or_default(),
    }
}

fn thread_from_node(node: ReviewThreadNode) -> ReviewThread {
    let comments = node
        .comments
        .map(|connection| connection.into_parts().1)
        .unwrap_or_default();
    ReviewThread {
        is_resolved: node.is_resolved == Some(true),
        is_outdated: node.is_outdated == Some(true),
        comments: comments.into_iter().map(comment_from_node).collect(),
    }
}
