//! Bun runtime and package manager.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

const INSTALL_SCRIPT: &str = "curl -fsSL https://bun.sh/install | bash";

pub struct BunInstaller {
    ctx: InstallerContext,
}

impl BunInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        BunInstaller { ctx }
    }
}

impl Installer for BunInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Bun
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.binary_works("bun")
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.binary_version("bun")
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("bun")
    }

    fn perform_install(&self) -> Result<()> {
        self.ctx
            .run_network(&ProcessBuilder::shell(INSTALL_SCRIPT), NETWORK_TIMEOUT)?;
        Ok(())
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.ctx
            .run_network(&ProcessBuilder::new("bun").arg("upgrade"), NETWORK_TIMEOUT)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::testing::Harness;
    use crate::util::process::CommandOutput;

    #[test]
    fn test_install_pipes_official_script() {
        let h = Harness::new();
        h.runner.set_default(CommandOutput::ok(""));

        BunInstaller::new(h.ctx.clone()).perform_install().unwrap();
        assert_eq!(
            h.runner.calls(),
            vec!["sh -c curl -fsSL https://bun.sh/install | bash".to_string()]
        );
    }

    #[test]
    fn test_upgrade() {
        let h = Harness::new();
        h.runner.expect("bun upgrade", CommandOutput::ok("Bun v1.1.34 is out!"));

        BunInstaller::new(h.ctx.clone()).perform_upgrade().unwrap();
        assert_eq!(h.runner.count("bun upgrade"), 1);
    }

    #[test]
    fn test_verify_needs_working_binary() {
        let h = Harness::new();
        h.runner
            .with_program("bun")
            .expect("bun --version", CommandOutput::failed(1, "segfault"));

        assert!(!BunInstaller::new(h.ctx.clone()).verify());
    }
}
