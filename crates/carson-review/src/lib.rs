//! Review convergence gate and late-activity sweep for Carson.
//!
//! The gate polls a pull request until its review state stops changing and
//! blocks on unresolved threads or unacknowledged actionable feedback. The
//! sweep audits recently active pull requests and keeps one rolling tracking
//! issue in sync with what it finds.

pub mod review_config;
pub mod review_convergence;
pub mod review_findings;
pub mod review_gate;
pub mod review_report;
pub mod review_runtime;
pub mod review_sweep;
pub mod review_text;
pub mod tracking_issue;

#[cfg(test)]
pub(crate) mod test_support;

pub use review_config::{
    default_config_path, default_report_dir, ConfigError, ReviewConfig, ReviewConfigOverrides,
    SweepState,
};
pub use review_convergence::{
    ConvergenceOutcome, ConvergencePhase, ConvergencePoller, GateSnapshot, PollSettings,
    PollSleeper, ReviewSignature, TokioPollSleeper,
};
pub use review_findings::{
    acknowledgements, actionable_top_level, deduplicate_by_url, is_acknowledged,
    latest_review_activity, unresolved_threads, Acknowledgement, Finding, FindingKind,
    ReviewVocabulary,
};
pub use review_gate::{run_review_gate, GateReport, GateRequest};
pub use review_report::{DirectoryReportSink, ReportKind, ReportPaths, ReportSink};
pub use review_runtime::{
    ReviewClock, ReviewRuntime, ReviewStatus, SystemReviewClock, EXIT_BLOCK, EXIT_ERROR, EXIT_OK,
};
pub use review_sweep::{
    deduplicate_sweep_findings, run_review_sweep, SweepFinding, SweepReport,
};
pub use review_text::{
    extract_disposition, extract_reference_urls, is_disposition_prefixed, matches_risk_keywords,
    Disposition, DispositionTokens, RiskKeywords,
};
pub use tracking_issue::{reconcile_tracking_issue, TrackingIssueAction, TrackingIssueOutcome};
