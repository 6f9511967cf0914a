//! Claude Code CLI, installed with the native installer script.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

const INSTALL_SCRIPT: &str = "curl -fsSL https://claude.ai/install.sh | bash";

pub struct ClaudeCodeInstaller {
    ctx: InstallerContext,
}

impl ClaudeCodeInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        ClaudeCodeInstaller { ctx }
    }
}

impl Installer for ClaudeCodeInstaller {
    fn tool(&self) -> ToolId {
        ToolId::ClaudeCode
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.binary_works("claude")
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.binary_version("claude")
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("claude")
    }

    fn perform_install(&self) -> Result<()> {
        self.ctx
            .run_network(&ProcessBuilder::shell(INSTALL_SCRIPT), NETWORK_TIMEOUT)?;
        Ok(())
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.ctx
            .run_network(&ProcessBuilder::new("claude").arg("update"), NETWORK_TIMEOUT)?;
        Ok(())
    }
}
