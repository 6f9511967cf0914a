//! `kickstart install` command

use anyhow::Result;

use super::{execute_run, orchestrator, prepare, tool_or_all, Session};
use crate::cli::InstallArgs;
use kickstart::ops::{Action, RunOptions};

pub fn execute(args: InstallArgs, session: &Session) -> Result<i32> {
    let tool = tool_or_all(args.tool, args.all, "install")?;
    let prepared = prepare(args.run.config.as_deref())?;

    let options = RunOptions {
        dry_run: args.run.dry_run,
        force: args.force,
    };
    let orch = orchestrator(session, prepared, options)?;

    Ok(execute_run(session, Action::Install, |on_event| {
        orch.run_install(tool, on_event)
    }))
}
