//! `kickstart setup-shell`: make `~/.local/bin` part of `PATH` in new shells.
//!
//! uv, Claude Code and uv-managed tools such as `specify` install into
//! `~/.local/bin`, which many login shells do not search by default.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::platform::{PlatformInfo, ShellKind};
use crate::util::fs::{append_once, read_to_string_or_empty};

/// Any mention of this in the rc file counts as already configured.
const MARKER: &str = ".local/bin";

/// Outcome of [`setup_shell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellSetup {
    Added(PathBuf),
    AlreadyConfigured(PathBuf),
    WouldAdd(PathBuf),
}

/// The `PATH` line for a shell's rc file.
pub fn path_line(shell: ShellKind) -> &'static str {
    match shell {
        ShellKind::Fish => "set -gx PATH $HOME/.local/bin $PATH",
        _ => r#"export PATH="$HOME/.local/bin:$PATH""#,
    }
}

/// Append the `PATH` line to the platform's rc file once.
pub fn setup_shell(platform: &PlatformInfo, dry_run: bool) -> Result<ShellSetup> {
    let rc = platform.shell_config_path.clone();

    if read_to_string_or_empty(&rc)?.contains(MARKER) {
        return Ok(ShellSetup::AlreadyConfigured(rc));
    }
    if dry_run {
        return Ok(ShellSetup::WouldAdd(rc));
    }

    append_once(&rc, &[MARKER], path_line(platform.shell))
        .with_context(|| format!("failed to update {}", rc.display()))?;
    tracing::info!("added ~/.local/bin to PATH in {}", rc.display());
    Ok(ShellSetup::Added(rc))
}
