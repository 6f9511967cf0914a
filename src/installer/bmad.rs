//! BMad Method, bootstrapped with `bunx`/`npx`.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, PackageManager, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

pub struct BmadInstaller {
    ctx: InstallerContext,
}

impl BmadInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        BmadInstaller { ctx }
    }

    /// `bunx` when bun is selected, else `npx` (brew has no runner).
    fn runner_program(&self) -> &'static str {
        match PackageManager::select(&self.ctx) {
            PackageManager::Bun => "bunx",
            PackageManager::Npm => "npx",
            PackageManager::Brew => {
                tracing::warn!("bmad-method cannot be installed with brew, using npx");
                "npx"
            }
        }
    }

    fn init(&self, package: &str) -> Result<()> {
        let program = self.runner_program();
        self.ctx.require(program, ToolId::BmadMethod)?;

        let cmd = ProcessBuilder::new(program)
            .args([package, "init"])
            .cwd(self.ctx.gctx.cwd());
        self.ctx.run_network(&cmd, NETWORK_TIMEOUT)?;
        Ok(())
    }
}

impl Installer for BmadInstaller {
    fn tool(&self) -> ToolId {
        ToolId::BmadMethod
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.binary_works("bmad")
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.binary_version("bmad")
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("bmad")
    }

    fn perform_install(&self) -> Result<()> {
        self.init("bmad-method")
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.init("bmad-method@latest")
    }
}
