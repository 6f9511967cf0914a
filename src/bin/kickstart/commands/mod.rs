//! Command implementations

pub mod completions;
pub mod init;
pub mod install;
pub mod setup_shell;
pub mod status;
pub mod upgrade;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use kickstart::core::report::InstallReport;
use kickstart::installer::InstallerContext;
use kickstart::ops::{exit_code_for, format_summary, Action, Orchestrator, RunEvent, RunOptions, RunResult};
use kickstart::util::config::{self, Config, ToolConfig};
use kickstart::util::diagnostic::{emit, suggestions, Diagnostic};
use kickstart::util::process::SystemRunner;
use kickstart::util::shell::{format_duration, Shell, Spinner, Status};
use kickstart::util::{GlobalContext, KickstartError};
use kickstart::PlatformInfo;

/// State shared by every command.
pub struct Session {
    pub shell: Shell,
    pub cancel: Arc<AtomicBool>,
}

/// Everything a run needs once configuration and platform checks passed.
pub struct Prepared {
    pub gctx: GlobalContext,
    pub platform: PlatformInfo,
    pub config: Config,
}

/// Resolve the layered configuration.
pub fn load_config(gctx: &GlobalContext, cli_config: Option<&Path>) -> Result<Config, KickstartError> {
    config::resolve(&gctx.config_paths(cli_config))
}

/// Resolve configuration and fail fast on an unsupported platform.
pub fn prepare(cli_config: Option<&Path>) -> Result<Prepared> {
    let gctx = GlobalContext::new()?;
    let config = load_config(&gctx, cli_config)?;

    let platform = PlatformInfo::detect(gctx.home());
    tracing::debug!("detected platform {}", platform);
    if !platform.is_supported() {
        return Err(KickstartError::PlatformUnsupported {
            os: platform.os.to_string(),
            arch: platform.arch.to_string(),
        }
        .into());
    }

    Ok(Prepared {
        gctx,
        platform,
        config,
    })
}

/// Build an orchestrator over the real system.
pub fn orchestrator(session: &Session, prepared: Prepared, options: RunOptions) -> Result<Orchestrator> {
    let base = InstallerContext::new(
        prepared.gctx,
        prepared.platform,
        ToolConfig::default(),
        prepared.config.registry.clone(),
        Arc::new(SystemRunner),
    );

    let orch = Orchestrator::new(prepared.config, base, options)?.with_cancel_flag(session.cancel.clone());
    Ok(orch)
}

fn finished_status(report: &InstallReport, action: Action) -> Status {
    if report.is_failed() {
        Status::Failed
    } else if report.is_skipped() {
        Status::Skipped
    } else if report.simulated {
        Status::DryRun
    } else {
        match action {
            Action::Install if report.tool.is_mirror() => Status::Configured,
            Action::Install => Status::Installed,
            Action::Upgrade => Status::Upgraded,
        }
    }
}

/// Drive a run, rendering progress as it happens, then print the summary.
///
/// Returns the process exit code derived from the run.
pub fn execute_run<F>(session: &Session, action: Action, run: F) -> i32
where
    F: FnOnce(&mut dyn FnMut(&RunEvent)) -> RunResult,
{
    let shell = &session.shell;
    let mut spinner: Option<Spinner> = None;

    let mut on_event = |event: &RunEvent| match event {
        RunEvent::ToolStarted { tool, action } => {
            let status = match action {
                Action::Install => Status::Installing,
                Action::Upgrade => Status::Upgrading,
            };
            spinner = Some(shell.spinner(status, tool.display_name()));
        }
        RunEvent::ToolFinished { report } => {
            if let Some(spinner) = spinner.take() {
                spinner.finish();
            }

            let mut line = format!("{}: {}", report.tool, report.message);
            if let Some(version) = &report.version {
                line.push_str(&format!(" (v{})", version));
            }
            shell.status(finished_status(report, action), line);
            if let Some(error) = &report.error {
                if shell.is_verbose() {
                    shell.note(error);
                }
            }
        }
    };

    let start = Instant::now();
    let result = run(&mut on_event);
    let summary = result.summary();

    if result.interrupted {
        shell.warn("interrupted, remaining tools were not processed");
    }
    shell.status(
        Status::Finished,
        format!("{} tools in {}", summary.total(), format_duration(start.elapsed())),
    );

    if !shell.is_quiet() {
        shell.print(format!("\n{}", format_summary(&summary)));

        if !summary.failures.is_empty() {
            let diag = Diagnostic::warning(format!(
                "{} of {} attempted tools failed",
                summary.failures.len(),
                summary.attempted()
            ))
            .with_suggestion(suggestions::RETRY_SINGLE)
            .with_suggestion(suggestions::VERBOSE);
            emit(&diag, shell.use_color());
        }
    }

    exit_code_for(&result)
}

/// Require exactly one of a tool or `--all`.
pub fn tool_or_all<T>(tool: Option<T>, all: bool, command: &str) -> Result<Option<T>, KickstartError> {
    match (tool, all) {
        (Some(tool), false) => Ok(Some(tool)),
        (None, true) => Ok(None),
        _ => Err(KickstartError::Usage(format!(
            "`kickstart {}` needs a tool name or --all",
            command
        ))),
    }
}
