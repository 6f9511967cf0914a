//! `kickstart status` command
//!
//! Works on any platform; nothing is installed or changed.

use std::sync::Arc;

use anyhow::Result;

use super::{load_config, Session};
use crate::cli::StatusArgs;
use kickstart::installer::InstallerContext;
use kickstart::ops::{detect_all, format_status_table};
use kickstart::util::config::ToolConfig;
use kickstart::util::process::SystemRunner;
use kickstart::util::shell::Status;
use kickstart::util::GlobalContext;
use kickstart::PlatformInfo;

pub fn execute(args: StatusArgs, session: &Session) -> Result<i32> {
    let gctx = GlobalContext::new()?;
    let config = load_config(&gctx, args.config.as_deref())?;
    let platform = PlatformInfo::detect(gctx.home());

    let base = InstallerContext::new(
        gctx,
        platform,
        ToolConfig::default(),
        config.registry.clone(),
        Arc::new(SystemRunner),
    );
    let spinner = session.shell.spinner(Status::Checking, "installed tools");
    let statuses = detect_all(&base, &config);
    spinner.finish();

    if session.shell.is_json() {
        session.shell.print_json(&statuses);
    } else {
        session.shell.print(format!("{}\n", format_status_table(&statuses)));
    }

    Ok(0)
}
