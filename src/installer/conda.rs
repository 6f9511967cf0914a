//! Miniconda.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::{Installer, InstallerContext, NETWORK_TIMEOUT};
use crate::core::platform::{Arch, Os};
use crate::core::tool::ToolId;
use crate::util::errors::KickstartError;
use crate::util::process::ProcessBuilder;

/// Mirror the Miniconda installers are fetched from.
pub const MINICONDA_MIRROR: &str = "https://mirrors.sustech.edu.cn/anaconda/miniconda";

const CONDA_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct CondaInstaller {
    ctx: InstallerContext,
}

impl CondaInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        CondaInstaller { ctx }
    }

    /// Installer script URL for the host platform.
    fn installer_url(&self) -> Result<String> {
        let platform = &self.ctx.platform;
        let name = match (platform.os, platform.arch) {
            (Os::Linux, Arch::X86_64) => "Linux-x86_64",
            (Os::Macos, Arch::Arm64) => "MacOSX-arm64",
            (Os::Macos, Arch::X86_64) => "MacOSX-x86_64",
            (os, arch) => {
                return Err(KickstartError::PlatformUnsupported {
                    os: os.to_string(),
                    arch: arch.to_string(),
                }
                .into())
            }
        };
        Ok(format!("{}/Miniconda3-latest-{}.sh", MINICONDA_MIRROR, name))
    }

    /// `conda` on PATH, else the one in `~/miniconda3/bin`.
    fn conda_bin(&self) -> Option<PathBuf> {
        self.ctx.which("conda").or_else(|| {
            Some(self.ctx.gctx.conda_dir().join("bin").join("conda")).filter(|p| p.is_file())
        })
    }
}

impl Installer for CondaInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Conda
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.conda_bin()
            .is_some_and(|bin| self.ctx.probe(&ProcessBuilder::new(bin).arg("--version")).is_some())
    }

    fn detect_version(&self) -> Option<String> {
        let bin = self.conda_bin()?;
        self.ctx.probe_version(&ProcessBuilder::new(bin).arg("--version"))
    }

    fn location(&self) -> Option<PathBuf> {
        self.conda_bin()
    }

    fn perform_install(&self) -> Result<()> {
        let url = self.installer_url()?;
        let scratch = self.ctx.scratch_dir()?;
        let script = scratch.path().join("miniconda.sh");
        self.ctx.download(&url, &script)?;

        let cmd = ProcessBuilder::new("bash")
            .arg(&script)
            .args(["-b", "-f", "-p"])
            .arg(self.ctx.gctx.conda_dir());
        self.ctx.run_with_timeout(&cmd, CONDA_INSTALL_TIMEOUT)?;
        Ok(())
    }

    fn perform_upgrade(&self) -> Result<()> {
        let bin = self.conda_bin().ok_or_else(|| KickstartError::ToolInstall {
            tool: ToolId::Conda,
            reason: "conda executable not found".to_string(),
        })?;
        let cmd = ProcessBuilder::new(bin).args(["update", "-n", "base", "-c", "defaults", "conda", "-y"]);
        self.ctx.run_network(&cmd, NETWORK_TIMEOUT)?;
        Ok(())
    }
}
