//! Drives installers through the fixed install order.
//!
//! The orchestrator is strictly sequential: tools share shell rc files and
//! package-manager config, and later tools rely on what earlier ones set up.
//! For every tool it reaches it produces exactly one [`InstallReport`]:
//!
//! 1. Disabled tools are skipped without constructing an installer.
//! 2. Installed tools (per [`Installer::verify`]) are skipped unless forced.
//! 3. Otherwise the installer runs; any error becomes a failed report and the
//!    loop moves on.
//!
//! The orchestrator itself never retries. Retries live inside the installers'
//! network steps.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::core::report::{InstallReport, Summary};
use crate::core::tool::{check_install_order, ToolId, INSTALL_ORDER};
use crate::installer::{create_installer, Installer, InstallerContext};
use crate::util::config::Config;
use crate::util::errors::KickstartError;

/// Builds an installer for a tool. Swappable for tests.
pub type InstallerFactory = dyn Fn(ToolId, InstallerContext) -> Box<dyn Installer> + Send + Sync;

/// Run-mode flags; not part of the persisted configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Simulate installs and upgrades
    pub dry_run: bool,

    /// Install even when the tool verifies as present
    pub force: bool,
}

/// What the orchestrator is doing to a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Upgrade,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install => write!(f, "install"),
            Action::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum RunEvent {
    /// An installer was constructed and is about to run.
    ToolStarted { tool: ToolId, action: Action },
    /// A report was recorded for a tool.
    ToolFinished { report: InstallReport },
}

/// Reports from one run, in install order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub reports: Vec<InstallReport>,

    /// The run stopped early because of a cancel request
    pub interrupted: bool,
}

impl RunResult {
    pub fn summary(&self) -> Summary {
        Summary::from_reports(&self.reports)
    }
}

/// Sequential scheduler over [`INSTALL_ORDER`].
pub struct Orchestrator {
    config: Config,
    base: InstallerContext,
    options: RunOptions,
    cancel: Arc<AtomicBool>,
    factory: Box<InstallerFactory>,
}

impl Orchestrator {
    /// Create an orchestrator over a resolved configuration.
    ///
    /// Fails if the install order disagrees with the dependency table.
    pub fn new(config: Config, base: InstallerContext, options: RunOptions) -> Result<Self, KickstartError> {
        check_install_order().map_err(KickstartError::InstallOrder)?;

        Ok(Orchestrator {
            config,
            base: base.with_dry_run(options.dry_run),
            options,
            cancel: Arc::new(AtomicBool::new(false)),
            factory: Box::new(create_installer),
        })
    }

    /// Replace the installer factory.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(ToolId, InstallerContext) -> Box<dyn Installer> + Send + Sync + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    /// Share a cancel flag, e.g. with a Ctrl-C handler.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that stops the run before the next tool starts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install one tool, or every tool when `tool` is `None`.
    pub fn run_install(&self, tool: Option<ToolId>, on_event: &mut dyn FnMut(&RunEvent)) -> RunResult {
        let tools: Vec<ToolId> = match tool {
            Some(tool) => vec![tool],
            None => INSTALL_ORDER.to_vec(),
        };

        self.run(&tools, Action::Install, on_event, |installer| {
            if self.options.force {
                installer.reinstall()
            } else {
                installer.install()
            }
        })
    }

    /// Upgrade a single tool, leaving every other tool untouched.
    ///
    /// A tool that is not installed gets a failed report.
    pub fn run_upgrade(&self, tool: ToolId, on_event: &mut dyn FnMut(&RunEvent)) -> RunResult {
        self.run(&[tool], Action::Upgrade, on_event, |installer| {
            if installer.verify() {
                installer.upgrade()
            } else {
                Err(KickstartError::ToolInstall {
                    tool: installer.tool(),
                    reason: "not installed".to_string(),
                }
                .into())
            }
        })
    }

    /// Upgrade every enabled tool that is installed; the rest are skipped.
    pub fn run_upgrade_all(&self, on_event: &mut dyn FnMut(&RunEvent)) -> RunResult {
        self.run(&INSTALL_ORDER, Action::Upgrade, on_event, |installer| {
            if installer.verify() {
                installer.upgrade()
            } else {
                Ok(InstallReport::skipped(installer.tool(), "not installed"))
            }
        })
    }

    fn run<F>(
        &self,
        tools: &[ToolId],
        action: Action,
        on_event: &mut dyn FnMut(&RunEvent),
        step: F,
    ) -> RunResult
    where
        F: Fn(&dyn Installer) -> anyhow::Result<InstallReport>,
    {
        let mut result = RunResult::default();

        for &tool in tools {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("interrupted before {}", tool);
                result.interrupted = true;
                break;
            }

            let report = self.step(tool, action, on_event, &step);
            on_event(&RunEvent::ToolFinished {
                report: report.clone(),
            });
            result.reports.push(report);
        }

        result
    }

    fn step<F>(
        &self,
        tool: ToolId,
        action: Action,
        on_event: &mut dyn FnMut(&RunEvent),
        step: &F,
    ) -> InstallReport
    where
        F: Fn(&dyn Installer) -> anyhow::Result<InstallReport>,
    {
        if !self.config.is_enabled(tool) {
            tracing::debug!("{} is disabled", tool);
            return InstallReport::skipped(tool, "disabled in configuration");
        }

        let ctx = self.base.for_tool(tool, &self.config);
        let installer = (self.factory)(tool, ctx);
        on_event(&RunEvent::ToolStarted { tool, action });

        match step(installer.as_ref()) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("{} failed: {:#}", tool, e);
                InstallReport::failed(
                    tool,
                    format!("failed to {} {}", action, tool.display_name()),
                    format!("{:#}", e),
                )
            }
        }
    }
}
