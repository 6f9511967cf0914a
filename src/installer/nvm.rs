//! Node Version Manager.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::platform::ShellKind;
use crate::core::tool::ToolId;
use crate::util::fs::append_once;
use crate::util::process::ProcessBuilder;

/// nvm release installed when no version is configured.
pub const DEFAULT_NVM_VERSION: &str = "v0.40.4";

/// Lines added to the shell rc so new shells load nvm.
const SHELL_BLOCK: &str = r#"# nvm
export NVM_DIR="$HOME/.nvm"
[ -s "$NVM_DIR/nvm.sh" ] && \. "$NVM_DIR/nvm.sh"
[ -s "$NVM_DIR/bash_completion" ] && \. "$NVM_DIR/bash_completion"
"#;

/// fish cannot source `nvm.sh`; export `NVM_DIR` for fish-side wrappers.
const FISH_BLOCK: &str = "# nvm\nset -gx NVM_DIR $HOME/.nvm\n";

pub struct NvmInstaller {
    ctx: InstallerContext,
}

impl NvmInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        NvmInstaller { ctx }
    }

    /// Configured version with a leading `v`.
    fn version(&self) -> String {
        match self.ctx.config.version.as_deref() {
            Some(v) if v.starts_with('v') => v.to_string(),
            Some(v) => format!("v{}", v),
            None => DEFAULT_NVM_VERSION.to_string(),
        }
    }

    fn script_url(&self) -> String {
        format!(
            "https://raw.githubusercontent.com/nvm-sh/nvm/{}/install.sh",
            self.version()
        )
    }

    fn nvm_version_cmd(&self) -> ProcessBuilder {
        ProcessBuilder::with_nvm(&self.ctx.gctx.nvm_sh(), "nvm --version")
    }

    fn run_install_script(&self) -> Result<()> {
        let scratch = self.ctx.scratch_dir()?;
        let script = scratch.path().join("nvm-install.sh");
        self.ctx.download(&self.script_url(), &script)?;

        let cmd = ProcessBuilder::new("bash")
            .arg(&script)
            .env("NVM_DIR", self.ctx.gctx.nvm_dir().display().to_string());
        self.ctx.run_network(&cmd, NETWORK_TIMEOUT)?;
        Ok(())
    }

    /// Make new shells load nvm. Leaves an already configured rc file alone.
    fn configure_shell(&self) -> Result<()> {
        let rc = &self.ctx.platform.shell_config_path;
        let appended = if self.ctx.platform.shell == ShellKind::Fish {
            tracing::warn!("nvm does not support fish; load it with a wrapper such as nvm.fish or bass");
            append_once(rc, &["NVM_DIR"], FISH_BLOCK)
        } else {
            append_once(rc, &["NVM_DIR", "nvm.sh"], SHELL_BLOCK)
        };
        let changed = appended.with_context(|| format!("failed to update {}", rc.display()))?;
        if changed {
            tracing::info!("added nvm to {}", rc.display());
        }
        Ok(())
    }
}

impl Installer for NvmInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Nvm
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.gctx.nvm_sh().is_file() && self.ctx.probe(&self.nvm_version_cmd()).is_some()
    }

    fn detect_version(&self) -> Option<String> {
        if !self.ctx.gctx.nvm_sh().is_file() {
            return None;
        }
        self.ctx.probe_version(&self.nvm_version_cmd())
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.ctx.gctx.nvm_dir()).filter(|dir| dir.is_dir())
    }

    fn perform_install(&self) -> Result<()> {
        self.run_install_script()?;
        self.configure_shell()
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.run_install_script()?;
        self.configure_shell()
    }
}
