//! `kickstart upgrade` command

use anyhow::Result;

use super::{execute_run, orchestrator, prepare, tool_or_all, Session};
use crate::cli::UpgradeArgs;
use kickstart::ops::{Action, RunOptions};

pub fn execute(args: UpgradeArgs, session: &Session) -> Result<i32> {
    let tool = tool_or_all(args.tool, args.all, "upgrade")?;
    let prepared = prepare(args.run.config.as_deref())?;

    let options = RunOptions {
        dry_run: args.run.dry_run,
        force: false,
    };
    let orch = orchestrator(session, prepared, options)?;

    Ok(execute_run(session, Action::Upgrade, |on_event| match tool {
        Some(tool) => orch.run_upgrade(tool, on_event),
        None => orch.run_upgrade_all(on_event),
    }))
}
