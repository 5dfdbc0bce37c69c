//! Classification of a pull request snapshot into findings and acknowledgements.

use std::collections::HashSet;

use carson_core::{format_rfc3339_seconds, latest_timestamp};
use carson_github::{PullRequestComment, PullRequestSnapshot};
use serde::{Deserialize, Serialize};

use crate::review_config::ReviewConfig;
use crate::review_text::{
    extract_disposition, extract_reference_urls, is_disposition_prefixed, matches_risk_keywords,
    Disposition, DispositionTokens, RiskKeywords,
};

pub const UNRESOLVED_THREAD_REASON: &str = "unresolved_thread";
pub const CHANGES_REQUESTED_REASON: &str = "changes_requested_review";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    UnresolvedThread,
    IssueComment,
    Review,
    RiskIssueComment,
    RiskReview,
    RiskThreadComment,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedThread => "unresolved_thread",
            Self::IssueComment => "issue_comment",
            Self::Review => "review",
            Self::RiskIssueComment => "risk_issue_comment",
            Self::RiskReview => "risk_review",
            Self::RiskThreadComment => "risk_thread_comment",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One piece of review feedback that may block a merge. `url` is its identity.
pub struct Finding {
    pub kind: FindingKind,
    pub url: String,
    pub author: String,
    pub created_at: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdated: Option<bool>,
}

impl Finding {
    fn from_comment(kind: FindingKind, comment: &PullRequestComment, reason: String) -> Self {
        Self {
            kind,
            url: comment.url.clone(),
            author: comment.author.clone(),
            created_at: comment.created_at.clone(),
            reason,
            outdated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Author response that marks the referenced findings as handled.
pub struct Acknowledgement {
    pub url: String,
    pub created_at: String,
    pub disposition: Disposition,
    pub target_urls: Vec<String>,
}

#[derive(Debug, Clone)]
/// Configured vocabulary shared by the gate and the sweep.
pub struct ReviewVocabulary {
    pub risk_keywords: RiskKeywords,
    pub disposition_prefix: String,
    pub disposition_tokens: DispositionTokens,
}

impl ReviewVocabulary {
    pub fn from_config(config: &ReviewConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            risk_keywords: RiskKeywords::new(&config.risk_keywords)?,
            disposition_prefix: config.disposition_prefix.clone(),
            disposition_tokens: DispositionTokens::new(Disposition::ALL)?,
        })
    }

    /// Replaces the accepted disposition tokens and their search order.
    pub fn with_disposition_tokens(mut self, tokens: DispositionTokens) -> Self {
        self.disposition_tokens = tokens;
        self
    }

    pub fn disposition(&self, text: &str) -> Option<Disposition> {
        extract_disposition(text, &self.disposition_tokens)
    }

    pub fn risk_hits<'a>(&'a self, text: &str) -> Vec<&'a str> {
        matches_risk_keywords(text, &self.risk_keywords)
    }

    pub fn is_prefixed(&self, text: &str) -> bool {
        is_disposition_prefixed(text, &self.disposition_prefix)
    }
}

/// Unresolved, current review threads.
///
/// Outdated threads belong to superseded diffs and never block.
pub fn unresolved_threads(snapshot: &PullRequestSnapshot) -> Vec<Finding> {
    snapshot
        .review_threads
        .iter()
        .enumerate()
        .filter(|(_, thread)| !thread.is_resolved && !thread.is_outdated)
        .map(|(index, thread)| {
            let first = thread.comments.first();
            let url = first
                .map(|comment| comment.url.trim())
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}#thread-{}", snapshot.url, index + 1));
            let latest = thread
                .comments
                .iter()
                .map(|comment| comment.created_at.as_str())
                .max()
                .unwrap_or_default();
            Finding {
                kind: FindingKind::UnresolvedThread,
                url,
                author: first.map(|comment| comment.author.clone()).unwrap_or_default(),
                created_at: latest.to_string(),
                reason: UNRESOLVED_THREAD_REASON.to_string(),
                outdated: Some(thread.is_outdated),
            }
        })
        .collect()
}

/// Non-author top-level comments and reviews that need a disposition.
pub fn actionable_top_level(
    snapshot: &PullRequestSnapshot,
    pr_author: &str,
    vocabulary: &ReviewVocabulary,
) -> Vec<Finding> {
    let mut items = Vec::new();
    for comment in &snapshot.comments {
        if comment.author == pr_author || vocabulary.is_prefixed(&comment.body) {
            continue;
        }
        let hits = vocabulary.risk_hits(&comment.body);
        if hits.is_empty() {
            continue;
        }
        items.push(Finding::from_comment(
            FindingKind::IssueComment,
            comment,
            format!("risk_keywords: {}", hits.join(", ")),
        ));
    }
    for review in &snapshot.reviews {
        if review.author == pr_author || vocabulary.is_prefixed(&review.body) {
            continue;
        }
        let hits = vocabulary.risk_hits(&review.body);
        let changes_requested = review.is_changes_requested();
        if hits.is_empty() && !changes_requested {
            continue;
        }
        let reason = if changes_requested {
            CHANGES_REQUESTED_REASON.to_string()
        } else {
            format!("risk_keywords: {}", hits.join(", "))
        };
        items.push(Finding {
            kind: FindingKind::Review,
            url: review.url.clone(),
            author: review.author.clone(),
            created_at: review.created_at.clone(),
            reason,
            outdated: None,
        });
    }
    deduplicate_by_url(items)
}

/// Disposition records authored by `pr_author` anywhere on the pull request.
pub fn acknowledgements<'a>(
    snapshot: &'a PullRequestSnapshot,
    pr_author: &str,
    vocabulary: &ReviewVocabulary,
) -> Vec<Acknowledgement> {
    let comment_source = |comment: &'a PullRequestComment| {
        (
            comment.author.as_str(),
            comment.body.as_str(),
            comment.url.as_str(),
            comment.created_at.as_str(),
        )
    };
    let review_sources = snapshot.reviews.iter().map(|review| {
        (
            review.author.as_str(),
            review.body.as_str(),
            review.url.as_str(),
            review.created_at.as_str(),
        )
    });
    snapshot
        .comments
        .iter()
        .map(comment_source)
        .chain(review_sources)
        .chain(snapshot.thread_comments().map(comment_source))
        .filter_map(|(author, body, url, created_at)| {
            if author != pr_author || !vocabulary.is_prefixed(body) {
                return None;
            }
            let disposition = vocabulary.disposition(body)?;
            let target_urls = extract_reference_urls(body);
            if target_urls.is_empty() {
                return None;
            }
            Some(Acknowledgement {
                url: url.to_string(),
                created_at: created_at.to_string(),
                disposition,
                target_urls,
            })
        })
        .collect()
}

/// True iff some acknowledgement targets exactly `finding.url`.
pub fn is_acknowledged(finding: &Finding, acknowledgements: &[Acknowledgement]) -> bool {
    acknowledgements
        .iter()
        .any(|ack| ack.target_urls.iter().any(|url| *url == finding.url))
}

/// Drops blank urls and later duplicates, preserving first-seen order.
pub fn deduplicate_by_url(items: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.url.is_empty() && seen.insert(item.url.clone()))
        .collect()
}

/// Latest parseable timestamp among the pull request update time and every
/// comment, review, and thread comment, as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn latest_review_activity(snapshot: &PullRequestSnapshot) -> Option<String> {
    let timestamps = std::iter::once(snapshot.updated_at.as_str())
        .chain(snapshot.comments.iter().map(|c| c.created_at.as_str()))
        .chain(snapshot.reviews.iter().map(|r| r.created_at.as_str()))
        .chain(snapshot.thread_comments().map(|c| c.created_at.as_str()));
    latest_timestamp(timestamps).map(format_rfc3339_seconds)
}
