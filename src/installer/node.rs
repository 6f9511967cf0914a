//! Node.js, installed and selected through nvm.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::{Installer, InstallerContext};
use crate::core::tool::ToolId;
use crate::util::errors::KickstartError;
use crate::util::process::ProcessBuilder;

/// Node version installed when none is configured.
pub const DEFAULT_NODE_VERSION: &str = "lts/*";

/// Building or downloading a Node release can take a while.
const NODE_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct NodeInstaller {
    ctx: InstallerContext,
}

impl NodeInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        NodeInstaller { ctx }
    }

    fn version(&self) -> &str {
        self.ctx
            .config
            .version
            .as_deref()
            .unwrap_or(DEFAULT_NODE_VERSION)
    }

    fn nvm(&self, script: impl AsRef<str>) -> ProcessBuilder {
        ProcessBuilder::with_nvm(&self.ctx.gctx.nvm_sh(), script)
    }

    fn require_nvm(&self) -> Result<()> {
        if self.ctx.gctx.nvm_sh().is_file() {
            Ok(())
        } else {
            Err(KickstartError::Dependency {
                dependency: ToolId::Nvm.to_string(),
                required_by: ToolId::Node,
            }
            .into())
        }
    }

    /// `nvm install <version>` followed by `nvm alias default <version>`.
    fn install_and_select(&self) -> Result<()> {
        self.require_nvm()?;
        let version = self.version();

        self.ctx
            .run_network(&self.nvm(format!("nvm install {}", version)), NODE_INSTALL_TIMEOUT)?;
        self.ctx
            .run(&self.nvm(format!("nvm alias default {}", version)))?;
        Ok(())
    }
}

impl Installer for NodeInstaller {
    fn tool(&self) -> ToolId {
        ToolId::Node
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.ctx.gctx.nvm_sh().is_file() && self.ctx.probe(&self.nvm("node --version")).is_some()
    }

    fn detect_version(&self) -> Option<String> {
        if !self.ctx.gctx.nvm_sh().is_file() {
            return None;
        }
        self.ctx.probe_version(&self.nvm("node --version"))
    }

    fn location(&self) -> Option<PathBuf> {
        if !self.ctx.gctx.nvm_sh().is_file() {
            return None;
        }
        self.ctx
            .probe(&self.nvm("command -v node"))
            .map(|out| PathBuf::from(out.stdout.trim()))
            .filter(|path| !path.as_os_str().is_empty())
    }

    fn perform_install(&self) -> Result<()> {
        self.install_and_select()
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.install_and_select()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::testing::Harness;
    use crate::util::config::ToolConfig;
    use crate::util::process::CommandOutput;

    fn fake_nvm(h: &Harness) {
        let nvm_sh = h.ctx.gctx.nvm_sh();
        std::fs::create_dir_all(nvm_sh.parent().unwrap()).unwrap();
        std::fs::write(&nvm_sh, "# nvm").unwrap();
    }

    #[test]
    fn test_install_uses_lts_by_default() {
        let h = Harness::new();
        fake_nvm(&h);
        h.runner.set_default(CommandOutput::ok(""));

        NodeInstaller::new(h.ctx.clone()).perform_install().unwrap();

        let calls = h.runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("&& nvm install lts/*"));
        assert!(calls[1].ends_with("&& nvm alias default lts/*"));
        assert!(calls[0].starts_with("bash -c source "));
    }

    #[test]
    fn test_install_pinned_version() {
        let h = Harness::with_config(ToolConfig {
            version: Some("20.11.1".into()),
            ..Default::default()
        });
        fake_nvm(&h);
        h.runner.set_default(CommandOutput::ok(""));

        NodeInstaller::new(h.ctx.clone()).perform_install().unwrap();
        assert_eq!(h.runner.count("nvm install 20.11.1"), 1);
        assert_eq!(h.runner.count("nvm alias default 20.11.1"), 1);
    }

    #[test]
    fn test_missing_nvm_is_dependency_error() {
        let h = Harness::new();
        let installer = NodeInstaller::new(h.ctx.clone());

        assert!(!installer.verify());
        let err = installer.perform_upgrade().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KickstartError>(),
            Some(KickstartError::Dependency { .. })
        ));
        assert!(h.runner.calls().is_empty());
    }

    #[test]
    fn test_version_and_location() {
        let h = Harness::new();
        fake_nvm(&h);
        h.runner
            .expect_contains("node --version", CommandOutput::ok("v22.11.0\n"))
            .expect_contains(
                "command -v node",
                CommandOutput::ok("/home/dev/.nvm/versions/node/v22.11.0/bin/node\n"),
            );

        let installer = NodeInstaller::new(h.ctx.clone());
        assert!(installer.verify());
        assert_eq!(installer.detect_version().as_deref(), Some("22.11.0"));
        assert_eq!(
            installer.location(),
            Some(PathBuf::from("/home/dev/.nvm/versions/node/v22.11.0/bin/node"))
        );
    }
}
