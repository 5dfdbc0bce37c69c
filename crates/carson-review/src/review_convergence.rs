//! Poll-until-stable detection for externally mutating review state.

use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use carson_github::{PullRequestSnapshot, PullRequestSource};

use crate::review_findings::{
    acknowledgements, actionable_top_level, is_acknowledged, latest_review_activity,
    unresolved_threads, Acknowledgement, Finding, ReviewVocabulary,
};

#[async_trait]
/// Delay between polls; injected so tests never wait.
pub trait PollSleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPollSleeper;

#[async_trait]
impl PollSleeper for TokioPollSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergencePhase {
    Warmup,
    Polling { attempt: usize },
    Converged { attempts: usize },
    Exhausted { attempts: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Values compared between consecutive polls.
pub struct ReviewSignature {
    pub latest_activity: Option<String>,
    pub unresolved_urls: Vec<String>,
    pub unacknowledged_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Classified view of one pull request read.
pub struct GateSnapshot {
    pub latest_activity: Option<String>,
    pub unresolved_threads: Vec<Finding>,
    pub actionable_top_level: Vec<Finding>,
    pub unacknowledged_actionable: Vec<Finding>,
    pub acknowledgements: Vec<Acknowledgement>,
}

impl GateSnapshot {
    pub fn classify(snapshot: &PullRequestSnapshot, vocabulary: &ReviewVocabulary) -> Self {
        let pr_author = snapshot.author.as_str();
        let actionable = actionable_top_level(snapshot, pr_author, vocabulary);
        let acks = acknowledgements(snapshot, pr_author, vocabulary);
        let unacknowledged = actionable
            .iter()
            .filter(|item| !is_acknowledged(item, &acks))
            .cloned()
            .collect();
        Self {
            latest_activity: latest_review_activity(snapshot),
            unresolved_threads: unresolved_threads(snapshot),
            actionable_top_level: actionable,
            unacknowledged_actionable: unacknowledged,
            acknowledgements: acks,
        }
    }

    pub fn signature(&self) -> ReviewSignature {
        ReviewSignature {
            latest_activity: self.latest_activity.clone(),
            unresolved_urls: sorted_urls(&self.unresolved_threads),
            unacknowledged_urls: sorted_urls(&self.unacknowledged_actionable),
        }
    }
}

fn sorted_urls(findings: &[Finding]) -> Vec<String> {
    let mut urls: Vec<String> = findings.iter().map(|item| item.url.clone()).collect();
    urls.sort();
    urls
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub wait_seconds: u64,
    pub poll_seconds: u64,
    pub max_polls: usize,
}

#[derive(Debug, Clone)]
pub struct ConvergenceOutcome {
    pub phase: ConvergencePhase,
    pub snapshot: GateSnapshot,
}

impl ConvergenceOutcome {
    pub fn converged(&self) -> bool {
        matches!(self.phase, ConvergencePhase::Converged { .. })
    }

    pub fn poll_attempts(&self) -> usize {
        match self.phase {
            ConvergencePhase::Converged { attempts } | ConvergencePhase::Exhausted { attempts } => {
                attempts
            }
            ConvergencePhase::Polling { attempt } => attempt,
            ConvergencePhase::Warmup => 0,
        }
    }
}

/// Reads and classifies a pull request until two consecutive signatures match
/// or the poll budget is spent.
pub struct ConvergencePoller<'a> {
    source: &'a dyn PullRequestSource,
    sleeper: &'a dyn PollSleeper,
    vocabulary: &'a ReviewVocabulary,
    settings: PollSettings,
}

impl<'a> ConvergencePoller<'a> {
    pub fn new(
        source: &'a dyn PullRequestSource,
        sleeper: &'a dyn PollSleeper,
        vocabulary: &'a ReviewVocabulary,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            sleeper,
            vocabulary,
            settings,
        }
    }

    pub async fn run(
        &self,
        number: u64,
        out: &mut (dyn Write + Send),
    ) -> Result<ConvergenceOutcome> {
        let max_polls = self.settings.max_polls.max(1);
        let mut phase = ConvergencePhase::Warmup;
        let mut previous: Option<ReviewSignature> = None;
        let mut latest: Option<GateSnapshot> = None;

        loop {
            phase = match phase {
                ConvergencePhase::Warmup => {
                    if self.settings.wait_seconds > 0 {
                        writeln!(out, "warmup_wait_seconds: {}", self.settings.wait_seconds)?;
                        self.sleeper
                            .sleep(Duration::from_secs(self.settings.wait_seconds))
                            .await;
                    }
                    ConvergencePhase::Polling { attempt: 1 }
                }
                ConvergencePhase::Polling { attempt } => {
                    let pull_request = self
                        .source
                        .fetch_pull_request(number)
                        .await
                        .with_context(|| format!("failed to read pull request #{number}"))?;
                    let snapshot = GateSnapshot::classify(&pull_request, self.vocabulary);
                    let signature = snapshot.signature();
                    writeln!(out, "poll_attempt: {attempt}/{max_polls}")?;
                    writeln!(
                        out,
                        "latest_activity: {}",
                        snapshot.latest_activity.as_deref().unwrap_or("unknown")
                    )?;
                    writeln!(out, "unresolved_threads: {}", snapshot.unresolved_threads.len())?;
                    writeln!(
                        out,
                        "unacknowledged_actionable: {}",
                        snapshot.unacknowledged_actionable.len()
                    )?;
                    tracing::debug!(
                        number,
                        attempt,
                        unresolved = snapshot.unresolved_threads.len(),
                        unacknowledged = snapshot.unacknowledged_actionable.len(),
                        "review poll"
                    );
                    latest = Some(snapshot);

                    if previous.as_ref() == Some(&signature) {
                        writeln!(out, "convergence: stable")?;
                        ConvergencePhase::Converged { attempts: attempt }
                    } else if attempt >= max_polls {
                        ConvergencePhase::Exhausted { attempts: attempt }
                    } else {
                        previous = Some(signature);
                        if self.settings.poll_seconds > 0 {
                            writeln!(out, "poll_wait_seconds: {}", self.settings.poll_seconds)?;
                            self.sleeper
                                .sleep(Duration::from_secs(self.settings.poll_seconds))
                                .await;
                        }
                        ConvergencePhase::Polling {
                            attempt: attempt + 1,
                        }
                    }
                }
                ConvergencePhase::Converged { .. } | ConvergencePhase::Exhausted { .. } => break,
            };
        }

        let snapshot = latest.ok_or_else(|| anyhow!("review polling ended without a snapshot"))?;
        tracing::info!(number, phase = ?phase, "review polling finished");
        Ok(ConvergenceOutcome { phase, snapshot })
    }
}
