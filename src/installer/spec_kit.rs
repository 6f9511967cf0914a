//! GitHub Spec Kit (`specify`), installed as a uv tool.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

const SOURCE: &str = "git+https://github.com/github/spec-kit.git";

pub struct SpecKitInstaller {
    ctx: InstallerContext,
}

impl SpecKitInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        SpecKitInstaller { ctx }
    }

    fn tool_install(&self, force: bool) -> Result<()> {
        self.ctx.require("uv", ToolId::SpecKit)?;

        let mut cmd = ProcessBuilder::new("uv").args(["tool", "install", "specify-cli", "--from", SOURCE]);
        if force {
            cmd = cmd.arg("--force");
        }
        self.ctx.run_network(&cmd, NETWORK_TIMEOUT)?;
        Ok(())
    }
}

impl Installer for SpecKitInstaller {
    fn tool(&self) -> ToolId {
        ToolId::SpecKit
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.which("specify").is_some()
            && self
                .ctx
                .probe(&ProcessBuilder::new("specify").arg("version"))
                .is_some()
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.which("specify")?;
        self.ctx
            .probe_version(&ProcessBuilder::new("specify").arg("version"))
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("specify")
    }

    fn perform_install(&self) -> Result<()> {
        self.tool_install(false)
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.tool_install(true)
    }
}
