//! Per-tool run results.
//!
//! An [`InstallReport`] is produced exactly once for every tool the
//! orchestrator reaches. [`Summary`] partitions a run's reports by outcome
//! while keeping install order within each partition.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::tool::ToolId;

/// Outcome of one tool step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Success,
    Skipped,
    Failed,
}

impl InstallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallOutcome::Success => "success",
            InstallOutcome::Skipped => "skipped",
            InstallOutcome::Failed => "failed",
        }
    }
}

/// Result of installing, upgrading or skipping one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Tool this report is about
    pub tool: ToolId,

    /// What happened
    pub outcome: InstallOutcome,

    /// Human-readable description
    pub message: String,

    /// Installed version, when it could be detected
    pub version: Option<String>,

    /// Captured error text for failed reports
    pub error: Option<String>,

    /// True when produced by a dry run
    pub simulated: bool,
}

impl InstallReport {
    /// Create a successful report.
    pub fn success(tool: ToolId, message: impl Into<String>) -> Self {
        InstallReport {
            tool,
            outcome: InstallOutcome::Success,
            message: message.into(),
            version: None,
            error: None,
            simulated: false,
        }
    }

    /// Create a skipped report.
    pub fn skipped(tool: ToolId, message: impl Into<String>) -> Self {
        InstallReport {
            tool,
            outcome: InstallOutcome::Skipped,
            message: message.into(),
            version: None,
            error: None,
            simulated: false,
        }
    }

    /// Create a failed report carrying the underlying error text.
    pub fn failed(tool: ToolId, message: impl Into<String>, error: impl Into<String>) -> Self {
        InstallReport {
            tool,
            outcome: InstallOutcome::Failed,
            message: message.into(),
            version: None,
            error: Some(error.into()),
            simulated: false,
        }
    }

    /// Create a success-shaped report for a dry run.
    pub fn simulated(tool: ToolId, action: &str) -> Self {
        InstallReport {
            tool,
            outcome: InstallOutcome::Success,
            message: format!("[dry-run] would {} {}", action, tool.display_name()),
            version: None,
            error: None,
            simulated: true,
        }
    }

    /// Set the detected version.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == InstallOutcome::Success
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == InstallOutcome::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == InstallOutcome::Failed
    }
}

/// Point-in-time detection result for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: ToolId,
    pub installed: bool,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn missing(name: ToolId) -> Self {
        ToolStatus {
            name,
            installed: false,
            version: None,
            path: None,
        }
    }

    pub fn installed(name: ToolId, version: Option<String>, path: Option<PathBuf>) -> Self {
        ToolStatus {
            name,
            installed: true,
            version,
            path,
        }
    }
}

/// Reports of one run partitioned by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub successes: Vec<InstallReport>,
    pub skips: Vec<InstallReport>,
    pub failures: Vec<InstallReport>,
}

impl Summary {
    /// Partition reports, keeping their relative order.
    pub fn from_reports(reports: &[InstallReport]) -> Self {
        let mut summary = Summary::default();
        for report in reports {
            let bucket = match report.outcome {
                InstallOutcome::Success => &mut summary.successes,
                InstallOutcome::Skipped => &mut summary.skips,
                InstallOutcome::Failed => &mut summary.failures,
            };
            bucket.push(report.clone());
        }
        summary
    }

    /// Total number of reports.
    pub fn total(&self) -> usize {
        self.successes.len() + self.skips.len() + self.failures.len()
    }

    /// Number of tools that were actually installed or upgraded (or failed trying).
    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// True when at least one tool was attempted and every attempt failed.
    pub fn all_attempted_failed(&self) -> bool {
        !self.failures.is_empty() && self.successes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builders() {
        let ok = InstallReport::success(ToolId::Bun, "installed")
            .with_version(Some("1.1.0".to_string()));
        assert!(ok.is_success());
        assert_eq!(ok.version.as_deref(), Some("1.1.0"));
        assert!(ok.error.is_none());

        let failed = InstallReport::failed(ToolId::Uv, "uv install failed", "exit code 1");
        assert!(failed.is_failed());
        assert_eq!(failed.error.as_deref(), Some("exit code 1"));

        let dry = InstallReport::simulated(ToolId::Codex, "install");
        assert!(dry.is_success());
        assert!(dry.simulated);
        assert!(dry.message.starts_with("[dry-run]"));
    }

    #[test]
    fn test_summary_preserves_order() {
        let reports = vec![
            InstallReport::success(ToolId::Nvm, "ok"),
            InstallReport::failed(ToolId::Node, "failed", "boom"),
            InstallReport::skipped(ToolId::Conda, "disabled"),
            InstallReport::success(ToolId::Bun, "ok"),
            InstallReport::failed(ToolId::Uv, "failed", "boom"),
        ];
        let summary = Summary::from_reports(&reports);

        let names = |v: &[InstallReport]| v.iter().map(|r| r.tool).collect::<Vec<_>>();
        assert_eq!(names(&summary.successes), vec![ToolId::Nvm, ToolId::Bun]);
        assert_eq!(names(&summary.skips), vec![ToolId::Conda]);
        assert_eq!(names(&summary.failures), vec![ToolId::Node, ToolId::Uv]);
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.attempted(), 4);
        assert!(!summary.all_attempted_failed());
    }

    #[test]
    fn test_all_attempted_failed() {
        let reports = vec![
            InstallReport::skipped(ToolId::Nvm, "already installed"),
            InstallReport::failed(ToolId::Node, "failed", "boom"),
        ];
        assert!(Summary::from_reports(&reports).all_attempted_failed());

        let skipped_only = vec![InstallReport::skipped(ToolId::Nvm, "disabled")];
        assert!(!Summary::from_reports(&skipped_only).all_attempted_failed());
    }
}
