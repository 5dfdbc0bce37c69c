//! GraphQL query text and response schema for pull request review reads.
//!
//! Every page query selects `number` so a paginated response can be checked
//! against the pull request that started the read.

use serde::Deserialize;

pub const PULL_REQUEST_DETAILS_QUERY: &str = r#"query($owner:String!, $repo:String!, $number:Int!) {
  repository(owner:$owner, name:$repo) {
    pullRequest(number:$number) {
      number
      title
      url
      state
      updatedAt
      mergedAt
      closedAt
      author { login }
      reviewThreads(first:100) {
        pageInfo { hasNextPage endCursor }
        nodes {
          isResolved
          isOutdated
          comments(first:100) {
            nodes { author { login } body url createdAt }
          }
        }
      }
      comments(first:100) {
        pageInfo { hasNextPage endCursor }
        nodes { author { login } body url createdAt }
      }
      reviews(first:100) {
        pageInfo { hasNextPage endCursor }
        nodes { author { login } state body url submittedAt }
      }
    }
  }
}"#;

pub const REVIEW_THREADS_PAGE_QUERY: &str = r#"query($owner:String!, $repo:String!, $number:Int!, $after:String!) {
  repository(owner:$owner, name:$repo) {
    pullRequest(number:$number) {
      number
      reviewThreads(first:100, after:$after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          isResolved
          isOutdated
          comments(first:100) {
            nodes { author { login } body url createdAt }
          }
        }
      }
    }
  }
}"#;

pub const COMMENTS_PAGE_QUERY: &str = r#"query($owner:String!, $repo:String!, $number:Int!, $after:String!) {
  repository(owner:$owner, name:$repo) {
    pullRequest(number:$number) {
      number
      comments(first:100, after:$after) {
        pageInfo { hasNextPage endCursor }
        nodes { author { login } body url createdAt }
      }
    }
  }
}"#;

pub const REVIEWS_PAGE_QUERY: &str = r#"query($owner:String!, $repo:String!, $number:Int!, $after:String!) {
  repository(owner:$owner, name:$repo) {
    pullRequest(number:$number) {
      number
      reviews(first:100, after:$after) {
        pageInfo { hasNextPage endCursor }
        nodes { author { login } state body url submittedAt }
      }
    }
  }
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Paginated connections hanging off a pull request node.
pub enum PullRequestConnection {
    ReviewThreads,
    Comments,
    Reviews,
}

impl PullRequestConnection {
    pub fn graphql_name(&self) -> &'static str {
        match self {
            Self::ReviewThreads => "reviewThreads",
            Self::Comments => "comments",
            Self::Reviews => "reviews",
        }
    }

    pub fn page_query(&self) -> &'static str {
        match self {
            Self::ReviewThreads => REVIEW_THREADS_PAGE_QUERY,
            Self::Comments => COMMENTS_PAGE_QUERY,
            Self::Reviews => REVIEWS_PAGE_QUERY,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlErrorEntry {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryData<T> {
    pub repository: Option<RepositoryNode<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode<T> {
    pub pull_request: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorNode {
    #[serde(default)]
    pub login: Option<String>,
}

pub fn actor_login(actor: Option<ActorNode>) -> String {
    actor.and_then(|actor| actor.login).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoNode {
    #[serde(default)]
    pub has_next_page: Option<bool>,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl PageInfoNode {
    /// Cursor for the next page, or `None` when pagination is finished.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page != Some(true) {
            return None;
        }
        self.end_cursor
            .as_deref()
            .map(str::trim)
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNode<T> {
    #[serde(default)]
    pub page_info: Option<PageInfoNode>,
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> ConnectionNode<T> {
    pub fn into_parts(self) -> (PageInfoNode, Vec<T>) {
        let page_info = self.page_info.unwrap_or_default();
        let items = self.nodes.unwrap_or_default().into_iter().flatten().collect();
        (page_info, items)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(default)]
    pub author: Option<ActorNode>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNode {
    #[serde(default)]
    pub author: Option<ActorNode>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewThreadNode {
    #[serde(default)]
    pub is_resolved: Option<bool>,
    #[serde(default)]
    pub is_outdated: Option<bool>,
    #[serde(default)]
    pub comments: Option<ConnectionNode<CommentNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Base pull request payload; metadata fields are required.
pub struct PullRequestNode {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: String,
    pub updated_at: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub author: Option<ActorNode>,
    #[serde(default)]
    pub review_threads: Option<ConnectionNode<ReviewThreadNode>>,
    #[serde(default)]
    pub comments: Option<ConnectionNode<CommentNode>>,
    #[serde(default)]
    pub reviews: Option<ConnectionNode<ReviewNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Follow-up page payload; only the requested connection is populated.
pub struct PullRequestPageNode {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub review_threads: Option<ConnectionNode<ReviewThreadNode>>,
    #[serde(default)]
    pub comments: Option<ConnectionNode<CommentNode>>,
    #[serde(default)]
    pub reviews: Option<ConnectionNode<ReviewNode>>,
}
