//! Review engine configuration: built-in defaults, an optional JSON file, and
//! explicit overrides, validated into one [`ReviewConfig`].

use std::path::{Path, PathBuf};

use carson_github::PullRequestState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_WAIT_SECONDS: u64 = 60;
pub const DEFAULT_POLL_SECONDS: u64 = 15;
pub const DEFAULT_MAX_POLLS: usize = 20;
pub const DEFAULT_DISPOSITION_PREFIX: &str = "Disposition:";
pub const DEFAULT_RISK_KEYWORDS: [&str; 6] =
    ["bug", "security", "incorrect", "block", "fail", "regression"];
pub const DEFAULT_SWEEP_WINDOW_DAYS: u64 = 3;
pub const DEFAULT_TRACKING_ISSUE_TITLE: &str = "Carson review sweep findings";
pub const DEFAULT_TRACKING_ISSUE_LABEL: &str = "carson-review-sweep";
pub const DEFAULT_GIT_REMOTE: &str = "github";

#[derive(Debug, Error, PartialEq, Eq)]
/// Invalid or unreadable review configuration.
pub enum ConfigError {
    #[error("unable to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid config JSON at {path} ({message})")]
    Parse { path: PathBuf, message: String },
    #[error("{key} must be at least 1")]
    NotPositive { key: &'static str },
    #[error("{key} cannot be empty")]
    Empty { key: &'static str },
    #[error("review.sweep.states must contain one or both of open, closed (found '{0}')")]
    UnknownSweepState(String),
    #[error("review.sweep.states cannot contain duplicates")]
    DuplicateSweepState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Sweep state filter; merged pull requests count as closed.
pub enum SweepState {
    Open,
    Closed,
}

impl SweepState {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ConfigError::UnknownSweepState(raw.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn for_pull_request(state: PullRequestState) -> Self {
        if state.is_open() {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Settings for the review gate and sweep.
pub struct ReviewConfig {
    pub wait_seconds: u64,
    pub poll_seconds: u64,
    pub max_polls: usize,
    pub disposition_prefix: String,
    pub risk_keywords: Vec<String>,
    pub sweep_window_days: u64,
    pub sweep_states: Vec<SweepState>,
    pub tracking_issue_title: String,
    pub tracking_issue_label: String,
    pub git_remote: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            wait_seconds: DEFAULT_WAIT_SECONDS,
            poll_seconds: DEFAULT_POLL_SECONDS,
            max_polls: DEFAULT_MAX_POLLS,
            disposition_prefix: DEFAULT_DISPOSITION_PREFIX.to_string(),
            risk_keywords: DEFAULT_RISK_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            sweep_window_days: DEFAULT_SWEEP_WINDOW_DAYS,
            sweep_states: vec![SweepState::Open, SweepState::Closed],
            tracking_issue_title: DEFAULT_TRACKING_ISSUE_TITLE.to_string(),
            tracking_issue_label: DEFAULT_TRACKING_ISSUE_LABEL.to_string(),
            git_remote: DEFAULT_GIT_REMOTE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Command-line or environment values that win over the config file.
pub struct ReviewConfigOverrides {
    pub wait_seconds: Option<u64>,
    pub poll_seconds: Option<u64>,
    pub max_polls: Option<usize>,
    pub disposition_prefix: Option<String>,
    pub sweep_window_days: Option<u64>,
    pub sweep_states: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    git: GitSection,
    #[serde(default)]
    review: ReviewSection,
}

#[derive(Debug, Default, Deserialize)]
struct GitSection {
    remote: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReviewSection {
    wait_seconds: Option<u64>,
    poll_seconds: Option<u64>,
    max_polls: Option<usize>,
    required_disposition_prefix: Option<String>,
    risk_keywords: Option<Vec<String>>,
    #[serde(default)]
    sweep: SweepSection,
    #[serde(default)]
    tracking_issue: TrackingIssueSection,
}

#[derive(Debug, Default, Deserialize)]
struct SweepSection {
    window_days: Option<u64>,
    states: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TrackingIssueSection {
    title: Option<String>,
    label: Option<String>,
}

/// `~/.carson/config.json`, when `HOME` is an absolute path.
pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let home = home.trim();
    if !home.starts_with('/') {
        return None;
    }
    Some(Path::new(home).join(".carson").join("config.json"))
}

/// `~/.cache/carson`, falling back to a relative `.carson-reports` directory.
pub fn default_report_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.trim().is_empty() => {
            Path::new(home.trim()).join(".cache").join("carson")
        }
        _ => PathBuf::from(".carson-reports"),
    }
}

impl ReviewConfig {
    /// Loads defaults, layers `config_path` (a missing file is ignored), then
    /// applies `overrides` and validates the result.
    pub fn load(
        config_path: Option<&Path>,
        overrides: &ReviewConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_path.filter(|path| path.is_file()) {
            let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
            let file: ConfigFile =
                serde_json::from_str(&raw).map_err(|error| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                })?;
            config.apply_file(file)?;
            tracing::debug!(path = %path.display(), "review config file applied");
        }
        config.apply_overrides(overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(remote) = file.git.remote {
            self.git_remote = remote.trim().to_string();
        }
        let review = file.review;
        if let Some(value) = review.wait_seconds {
            self.wait_seconds = value;
        }
        if let Some(value) = review.poll_seconds {
            self.poll_seconds = value;
        }
        if let Some(value) = review.max_polls {
            self.max_polls = value;
        }
        if let Some(value) = review.required_disposition_prefix {
            self.disposition_prefix = value.trim().to_string();
        }
        if let Some(values) = review.risk_keywords {
            self.risk_keywords = non_blank_entries(values);
        }
        if let Some(value) = review.sweep.window_days {
            self.sweep_window_days = value;
        }
        if let Some(values) = review.sweep.states {
            self.sweep_states = parse_sweep_states(values)?;
        }
        if let Some(value) = review.tracking_issue.title {
            self.tracking_issue_title = value.trim().to_string();
        }
        if let Some(value) = review.tracking_issue.label {
            self.tracking_issue_label = value.trim().to_string();
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ReviewConfigOverrides) -> Result<(), ConfigError> {
        if let Some(value) = overrides.wait_seconds {
            self.wait_seconds = value;
        }
        if let Some(value) = overrides.poll_seconds {
            self.poll_seconds = value;
        }
        if let Some(value) = overrides.max_polls {
            self.max_polls = value;
        }
        if let Some(value) = overrides
            .disposition_prefix
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            self.disposition_prefix = value.to_string();
        }
        if let Some(value) = overrides.sweep_window_days {
            self.sweep_window_days = value;
        }
        if let Some(values) = overrides.sweep_states.clone() {
            let values = non_blank_entries(values);
            if !values.is_empty() {
                self.sweep_states = parse_sweep_states(values)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git_remote.trim().is_empty() {
            return Err(ConfigError::Empty { key: "git.remote" });
        }
        if self.max_polls == 0 {
            return Err(ConfigError::NotPositive {
                key: "review.max_polls",
            });
        }
        if self.sweep_window_days == 0 {
            return Err(ConfigError::NotPositive {
                key: "review.sweep.window_days",
            });
        }
        if self.disposition_prefix.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "review.required_disposition_prefix",
            });
        }
        if self.risk_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Empty {
                key: "review.risk_keywords",
            });
        }
        if self.sweep_states.is_empty() {
            return Err(ConfigError::Empty {
                key: "review.sweep.states",
            });
        }
        let has_duplicate_state = self
            .sweep_states
            .iter()
            .enumerate()
            .any(|(index, state)| self.sweep_states[..index].contains(state));
        if has_duplicate_state {
            return Err(ConfigError::DuplicateSweepState);
        }
        if self.tracking_issue_title.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "review.tracking_issue.title",
            });
        }
        if self.tracking_issue_label.trim().is_empty() {
            return Err(ConfigError::Empty {
                key: "review.tracking_issue.label",
            });
        }
        Ok(())
    }

    pub fn includes_sweep_state(&self, state: PullRequestState) -> bool {
        self.sweep_states.contains(&SweepState::for_pull_request(state))
    }
}

fn non_blank_entries(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_sweep_states(values: Vec<String>) -> Result<Vec<SweepState>, ConfigError> {
    let mut states = Vec::new();
    for value in non_blank_entries(values) {
        let state = SweepState::parse(&value)?;
        if states.contains(&state) {
            return Err(ConfigError::DuplicateSweepState);
        }
        states.push(state);
    }
    Ok(states)
}
