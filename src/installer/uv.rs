//! uv, the Python package and project manager.

use std::path::PathBuf;

use anyhow::Result;

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::tool::ToolId;
use crate::util::process::ProcessBuilder;

const INSTALL_SCRIPT: &str = "curl -LsSf https://astral.sh/uv/install.sh | sh";

pub struct UvInstaller {
    ctx: InstallerContext,
}

impl UvInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        UvInstaller { ctx }
    }
}

impl Installer for UvInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Uv
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.binary_works("uv")
    }

    fn detect_version(&self) -> Option<String> {
        self.ctx.binary_version("uv")
    }

    fn location(&self) -> Option<PathBuf> {
        self.ctx.which("uv")
    }

    fn perform_install(&self) -> Result<()> {
        self.ctx
            .run_network(&ProcessBuilder::shell(INSTALL_SCRIPT), NETWORK_TIMEOUT)?;
        Ok(())
    }

    fn perform_upgrade(&self) -> Result<()> {
        let cmd = ProcessBuilder::new("uv").args(["self", "update"]);
        self.ctx.run_network(&cmd, NETWORK_TIMEOUT)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::testing::Harness;
    use crate::util::process::CommandOutput;

    #[test]
    fn test_install_and_upgrade_commands() {
        let h = Harness::new();
        h.runner.set_default(CommandOutput::ok(""));

        let installer = UvInstaller::new(h.ctx.clone());
        installer.perform_install().unwrap();
        installer.perform_upgrade().unwrap();

        assert_eq!(
            h.runner.calls(),
            vec![
                "sh -c curl -LsSf https://astral.sh/uv/install.sh | sh".to_string(),
                "uv self update".to_string(),
            ]
        );
    }

    #[test]
    fn test_version_from_output() {
        let h = Harness::new();
        h.runner
            .with_program("uv")
            .expect("uv --version", CommandOutput::ok("uv 0.5.4 (c62c83c37 2024-11-20)\n"));

        let installer = UvInstaller::new(h.ctx.clone());
        assert!(installer.verify());
        assert_eq!(installer.detect_version().as_deref(), Some("0.5.4"));
        assert_eq!(installer.location(), Some(PathBuf::from("/usr/local/bin/uv")));
    }
}
