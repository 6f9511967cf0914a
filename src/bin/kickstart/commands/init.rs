//! `kickstart init` command
//!
//! Resolves configuration, optionally asks which tools to enable, then
//! installs every enabled tool in dependency order.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use super::{execute_run, orchestrator, prepare, Session};
use crate::cli::InitArgs;
use kickstart::ops::{Action, RunOptions};
use kickstart::util::config::Config;
use kickstart::util::shell::Status;
use kickstart::INSTALL_ORDER;

pub fn execute(args: InitArgs, session: &Session) -> Result<i32> {
    let mut prepared = prepare(args.run.config.as_deref())?;

    if args.interactive {
        let stdin = io::stdin();
        configure_interactively(&mut prepared.config, &mut stdin.lock(), &mut io::stderr())?;
    }

    if args.save_config {
        let path = prepared.gctx.project_config_path();
        if args.run.dry_run {
            session
                .shell
                .status(Status::DryRun, format!("would save configuration to {}", path.display()));
        } else {
            prepared.config.save(&path)?;
            session.shell.status(Status::Saved, path.display());
        }
    }

    let options = RunOptions {
        dry_run: args.run.dry_run,
        force: args.force,
    };
    let orch = orchestrator(session, prepared, options)?;

    Ok(execute_run(session, Action::Install, |on_event| {
        orch.run_install(None, on_event)
    }))
}

/// Ask, tool by tool, whether it should be enabled.
///
/// An empty answer (or end of input) keeps the resolved setting.
fn configure_interactively(config: &mut Config, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<()> {
    for tool in INSTALL_ORDER {
        let enabled = config.is_enabled(tool);
        let hint = if enabled { "[Y/n]" } else { "[y/N]" };
        write!(output, "Enable {} ({})? {} ", tool.display_name(), tool, hint)?;
        output.flush()?;

        let mut answer = String::new();
        input
            .read_line(&mut answer)
            .context("failed to read answer from stdin")?;

        config.tool_mut(tool).enabled = parse_answer(&answer, enabled);
    }

    writeln!(output)?;
    Ok(())
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}
