//! Result of one fetch-parse-deliver cycle.

use serde::Serialize;

/// What the host scheduler should do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Run again after the normal interval.
    Success,
    /// Run again after backoff.
    Retry,
    /// Stop firing until explicitly restarted.
    FatalFailure,
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Retry => f.write_str("retry"),
            Self::FatalFailure => f.write_str("fatal_failure"),
        }
    }
}

/// Outcome plus the counters logged for a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Records decoded from the feed.
    pub fetched: usize,
    /// Records the renderer accepted.
    pub delivered: usize,
    /// Records whose render failed.
    pub failed: usize,
    /// The registry no longer authorized the mechanism, nothing was fetched.
    pub skipped: bool,
    /// Cause of a `Retry` or `FatalFailure`.
    pub error: Option<String>,
}

impl CycleReport {
    #[must_use]
    pub fn success(fetched: usize, delivered: usize, failed: usize) -> Self {
        Self {
            outcome: CycleOutcome::Success,
            fetched,
            delivered,
            failed,
            skipped: false,
            error: None,
        }
    }

    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::success(0, 0, 0)
        }
    }

    #[must_use]
    pub fn retry(error: impl Into<String>) -> Self {
        Self {
            outcome: CycleOutcome::Retry,
            error: Some(error.into()),
            ..Self::success(0, 0, 0)
        }
    }

    #[must_use]
    pub fn fatal(error: impl Into<String>) -> Self {
        Self {
            outcome: CycleOutcome::FatalFailure,
            error: Some(error.into()),
            ..Self::success(0, 0, 0)
        }
    }
}
