//! OpenAI Codex CLI, a global npm package.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, PackageManager, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

const PACKAGE: &str = "@openai/codex";

pub struct CodexInstaller {
    ctx: InstallerContext,
}

impl CodexInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        CodexInstaller { ctx }
    }

    fn install_cmd(&self, pm: PackageManager) -> ProcessBuilder {
        match pm {
            PackageManager::Bun => ProcessBuilder::new("bun").args(["install", "-g", PACKAGE]),
            PackageManager::Npm => ProcessBuilder::new("npm").args(["i", "-g", PACKAGE]),
            PackageManager::Brew => ProcessBuilder::new("brew").args(["install", "codex"]),
        }
    }

    fn upgrade_cmd(&self, pm: PackageManager) -> ProcessBuilder {
        match pm {
            PackageManager::Bun => ProcessBuilder::new("bun").args(["update", "-g", PACKAGE]),
            PackageManager::Npm => ProcessBuilder::new("npm").args(["update", "-g", PACKAGE]),
            PackageManager::Brew => ProcessBuilder::new("brew").args(["upgrade", "codex"]),
        }
    }

    fn run_with(&self, build: impl Fn(&Self, PackageManager) -> ProcessBuilder) -> Result<()> {
        let pm = PackageManager::select(&self.ctx);
        self.ctx.require(pm.program(), ToolId::Codex)?;
        tracing::debug!("installing {} with {}", PACKAGE, pm.program());
        self.ctx.run_network(&build(self, pm), NETWORK_TIMEOUT)?;
        Ok(())
    }
}

impl Installer for CodexInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Codex
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.binary_works("codex")
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.binary_version("codex")
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("codex")
    }

    fn perform_install(&self) -> Result<()> {
        self.run_with(Self::install_cmd)
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.run_with(Self::upgrade_cmd)
    }
}
