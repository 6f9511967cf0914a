//! `kickstart setup-shell` command

use anyhow::Result;

use super::Session;
use crate::cli::SetupShellArgs;
use kickstart::ops::{setup_shell, ShellSetup};
use kickstart::util::shell::Status;
use kickstart::util::GlobalContext;
use kickstart::PlatformInfo;

pub fn execute(args: SetupShellArgs, session: &Session) -> Result<i32> {
    let gctx = GlobalContext::new()?;
    let platform = PlatformInfo::detect(gctx.home());
    let shell = &session.shell;

    match setup_shell(&platform, args.dry_run)? {
        ShellSetup::Added(rc) => {
            shell.status(Status::Configured, format!("~/.local/bin added to PATH in {}", rc.display()));
            shell.note(format!("run `source {}` or open a new shell to use it", rc.display()));
        }
        ShellSetup::AlreadyConfigured(rc) => {
            shell.status(Status::Skipped, format!("{} already puts ~/.local/bin on PATH", rc.display()));
        }
        ShellSetup::WouldAdd(rc) => {
            shell.status(Status::DryRun, format!("would add ~/.local/bin to PATH in {}", rc.display()));
        }
    }

    Ok(0)
}
