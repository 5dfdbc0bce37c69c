use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Enumerates supported `PullRequestState` values.
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "MERGED" => Some(Self::Merged),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Merged => "MERGED",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Top-level pull request comment (issue comment) as seen by review checks.
pub struct PullRequestComment {
    pub author: String,
    pub body: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Submitted pull request review; `created_at` carries the submission time.
pub struct PullRequestReview {
    pub author: String,
    pub state: String,
    pub body: String,
    pub url: String,
    pub created_at: String,
}

impl PullRequestReview {
    pub fn is_changes_requested(&self) -> bool {
        self.state == "CHANGES_REQUESTED"
    }

    /// The review body viewed as a comment, for checks that ignore review state.
    pub fn as_comment(&self) -> PullRequestComment {
        PullRequestComment {
            author: self.author.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewThread {
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub comments: Vec<PullRequestComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One fully paginated read of a pull request's review state.
pub struct PullRequestSnapshot {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PullRequestState,
    pub updated_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
    pub author: String,
    pub comments: Vec<PullRequestComment>,
    pub reviews: Vec<PullRequestReview>,
    pub review_threads: Vec<ReviewThread>,
}

impl PullRequestSnapshot {
    pub fn summary(&self) -> PullRequestSummary {
        PullRequestSummary {
            number: self.number,
            title: self.title.clone(),
            url: self.url.clone(),
            state: self.state,
        }
    }

    /// Every comment nested inside review threads, in thread order.
    pub fn thread_comments(&self) -> impl Iterator<Item = &PullRequestComment> {
        self.review_threads
            .iter()
            .flat_map(|thread| thread.comments.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Pull request identity used in gate reports.
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PullRequestState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Sweep candidate from the recently-updated pull request listing.
pub struct RecentPullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PullRequestState,
    pub updated_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Remote issue mirrored by the sweep tracking reconciler.
pub struct TrackingIssueState {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub url: String,
}
