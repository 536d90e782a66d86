//! Run reporting: per-item outcome aggregation and the audit-trail file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyncError;
use crate::model::{RunMode, SyncAction, SyncOutcome};

/// Aggregated action counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub error: u32,
    pub total: u32,
}

impl RunSummary {
    /// Add one outcome to the counts.
    pub fn add(&mut self, action: SyncAction) {
        self.total += 1;
        match action {
            SyncAction::Created => self.created += 1,
            SyncAction::Updated => self.updated += 1,
            SyncAction::Skipped => self.skipped += 1,
            SyncAction::Error => self.error += 1,
        }
    }
}

/// Durable report for one reconciliation run.
///
/// Written once per run as the audit trail; never read back by the
/// engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunReport {
    /// When the run started.
    pub executed_at: DateTime<Utc>,
    /// Run mode.
    pub mode: RunMode,
    /// Wall-clock duration.
    pub duration_seconds: u64,
    /// Aggregated counts.
    pub summary: RunSummary,
    /// Fatal error that aborted the run, if any. Outcomes produced
    /// before the abort are still present in `results`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-item outcomes, for auditing specific accounts.
    pub results: Vec<SyncOutcome>,
}

impl SyncRunReport {
    /// Mode- and timestamp-tagged file name for this report.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "billing-sync-{}-{}.json",
            self.mode,
            self.executed_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, SyncError> {
        fs::create_dir_all(dir)
            .map_err(|e| SyncError::Report(format!("failed to create {}: {e}", dir.display())))?;

        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SyncError::Report(format!("failed to serialize report: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| SyncError::Report(format!("failed to write {}: {e}", path.display())))?;

        Ok(path)
    }
}

/// Accumulates per-item outcomes during a run. Pure aggregation.
pub struct RunReporter {
    mode: RunMode,
    executed_at: DateTime<Utc>,
    started: Instant,
    summary: RunSummary,
    results: Vec<SyncOutcome>,
}

impl RunReporter {
    /// Start a reporter for one run.
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            executed_at: Utc::now(),
            started: Instant::now(),
            summary: RunSummary::default(),
            results: Vec::new(),
        }
    }

    /// Record one outcome.
    pub fn record(&mut self, outcome: SyncOutcome) {
        debug!(
            customer_id = %outcome.external_customer_id,
            subscription_id = %outcome.external_subscription_id,
            action = %outcome.action,
            reason = outcome.reason.as_deref().unwrap_or(""),
            "Recorded outcome"
        );
        self.summary.add(outcome.action);
        self.results.push(outcome);
    }

    /// Current counts.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Outcomes recorded so far.
    #[must_use]
    pub fn results(&self) -> &[SyncOutcome] {
        &self.results
    }

    /// Finish a completed run.
    #[must_use]
    pub fn finish(self) -> SyncRunReport {
        self.into_report(None)
    }

    /// Finish an aborted run, keeping already-produced outcomes.
    #[must_use]
    pub fn finish_with_error(self, error: String) -> SyncRunReport {
        self.into_report(Some(error))
    }

    fn into_report(self, error: Option<String>) -> SyncRunReport {
        SyncRunReport {
            executed_at: self.executed_at,
            mode: self.mode,
            duration_seconds: self.started.elapsed().as_secs(),
            summary: self.summary,
            error,
            results: self.results,
        }
    }
}
