//! Collaborators shared by the review gate and the review sweep.

use anyhow::{Context, Result};
use carson_github::{IssueTracker, PullRequestSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::review_config::ReviewConfig;
use crate::review_convergence::PollSleeper;
use crate::review_findings::ReviewVocabulary;
use crate::review_report::ReportSink;

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_BLOCK: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Verdict of a gate or sweep run.
pub enum ReviewStatus {
    Ok,
    Block,
}

impl ReviewStatus {
    pub fn from_blocking(blocked: bool) -> Self {
        if blocked {
            Self::Block
        } else {
            Self::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Block => "block",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ok => EXIT_OK,
            Self::Block => EXIT_BLOCK,
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of "now" for report timestamps and the sweep cutoff.
pub trait ReviewClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemReviewClock;

impl ReviewClock for SystemReviewClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything a review command needs, passed explicitly.
pub struct ReviewRuntime<'a> {
    pub config: &'a ReviewConfig,
    pub vocabulary: ReviewVocabulary,
    pub pull_requests: &'a dyn PullRequestSource,
    pub issues: &'a dyn IssueTracker,
    pub sleeper: &'a dyn PollSleeper,
    pub clock: &'a dyn ReviewClock,
    pub reports: &'a dyn ReportSink,
}

impl<'a> ReviewRuntime<'a> {
    pub fn new(
        config: &'a ReviewConfig,
        pull_requests: &'a dyn PullRequestSource,
        issues: &'a dyn IssueTracker,
        sleeper: &'a dyn PollSleeper,
        clock: &'a dyn ReviewClock,
        reports: &'a dyn ReportSink,
    ) -> Result<Self> {
        let vocabulary =
            ReviewVocabulary::from_config(config).context("failed to compile risk keywords")?;
        Ok(Self {
            config,
            vocabulary,
            pull_requests,
            issues,
            sleeper,
            clock,
            reports,
        })
    }
}
