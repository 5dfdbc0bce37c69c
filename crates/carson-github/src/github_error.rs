use thiserror::Error;

#[derive(Debug, Error)]
/// Failures raised while talking to GitHub through the `gh` CLI.
pub enum GithubError {
    #[error("{program} CLI not available in PATH ({message})")]
    CommandUnavailable { program: String, message: String },
    #[error("{operation} failed: {detail}")]
    CommandFailed { operation: String, detail: String },
    #[error("invalid gh JSON response for {operation} ({detail})")]
    MalformedResponse { operation: String, detail: String },
    #[error("graphql request for {operation} returned errors: {messages}")]
    GraphqlErrors { operation: String, messages: String },
    #[error("pull request #{0} not found")]
    PullRequestNotFound(u64),
    #[error("pull request #{number} not found during {connection} pagination")]
    PullRequestMissingDuringPagination {
        connection: &'static str,
        number: u64,
    },
    #[error("{connection} pagination for pull request #{expected} returned {found}")]
    PullRequestMismatch {
        connection: &'static str,
        expected: u64,
        found: String,
    },
    #[error("missing {connection} payload during pagination of pull request #{number}")]
    MissingConnection {
        connection: &'static str,
        number: u64,
    },
    #[error(
        "pagination exceeded safety limit of {limit} pages for {connection} (pull request #{number})"
    )]
    PaginationLimitExceeded {
        connection: &'static str,
        number: u64,
        limit: usize,
    },
    #[error("pagination exceeded safety limit of {limit} pages while listing {listing}")]
    ListingLimitExceeded { listing: &'static str, limit: usize },
    #[error("invalid repository reference '{0}', expected owner/repo")]
    InvalidRepository(String),
}

impl GithubError {
    pub(crate) fn malformed(operation: &str, detail: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }
}
