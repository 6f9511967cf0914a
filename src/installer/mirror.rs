//! Registry mirror configuration for npm, Bun and uv.
//!
//! Mirrors are "installed" by writing package-manager configuration. Each
//! requires its base tool: npm is configured through the `npm` CLI, while Bun
//! and uv are configured by editing their config files in place so that
//! unrelated settings survive.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml_edit::{value, ArrayOfTables, DocumentMut, Item, Table};

use super::{Installer, InstallerContext};
use crate::core::tool::ToolId;
use crate::util::errors::KickstartError;
use crate::util::fs::{read_to_string_or_empty, write_atomic};
use crate::util::process::ProcessBuilder;

/// Registry URLs compare equal regardless of a trailing slash.
fn same_url(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

fn read_toml(path: &Path) -> Result<DocumentMut> {
    let contents = read_to_string_or_empty(path)?;
    contents
        .parse::<DocumentMut>()
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Like [`read_toml`], for detection: unreadable or invalid files count as unconfigured.
fn peek_toml(path: &Path) -> Option<DocumentMut> {
    if !path.is_file() {
        return None;
    }
    read_toml(path)
        .map_err(|e| tracing::debug!("{:#}", e))
        .ok()
}

fn write_config(path: &Path, doc: &DocumentMut) -> Result<()> {
    write_atomic(path, doc.to_string().as_bytes()).map_err(|e| {
        let denied = e.chain().any(|cause| {
            cause
                .downcast_ref::<io::Error>()
                .is_some_and(|io| io.kind() == io::ErrorKind::PermissionDenied)
        });
        if denied {
            KickstartError::Permission {
                path: path.to_path_buf(),
                operation: "write".to_string(),
            }
            .into()
        } else {
            e
        }
    })
}

/// Points npm at the configured registry.
pub struct NpmMirrorInstaller {
    ctx: InstallerContext,
}

impl NpmMirrorInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        NpmMirrorInstaller { ctx }
    }

    fn current_registry(&self) -> Option<String> {
        self.ctx.which("npm")?;
        self.ctx
            .probe(&ProcessBuilder::new("npm").args(["get", "registry"]))
            .map(|out| out.stdout.trim().to_string())
    }

    fn configure(&self) -> Result<()> {
        self.ctx.require("npm", ToolId::NpmMirror)?;
        let cmd = ProcessBuilder::new("npm").args(["config", "set", "registry", &self.ctx.registry.npm]);
        self.ctx.run(&cmd)?;
        Ok(())
    }
}

impl Installer for NpmMirrorInstaller {
    fn tool(&self) -> ToolId {
        ToolId::NpmMirror
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.current_registry()
            .is_some_and(|current| same_url(&current, &self.ctx.registry.npm))
    }

    fn detect_version(&self) -> Option<String> {
        self.current_registry()
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.ctx.home().join(".npmrc")).filter(|p| p.is_file())
    }

    fn perform_install(&self) -> Result<()> {
        self.configure()
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.configure()
    }
}

/// Sets `[install] registry` in `~/.bunfig.toml`.
pub struct BunMirrorInstaller {
    ctx: InstallerContext,
}

impl BunMirrorInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        BunMirrorInstaller { ctx }
    }

    fn current_registry(&self) -> Option<String> {
        let doc = peek_toml(&self.ctx.gctx.bunfig_path())?;
        doc.get("install")?
            .as_table_like()?
            .get("registry")?
            .as_str()
            .map(String::from)
    }

    fn configure(&self) -> Result<()> {
        self.ctx.require("bun", ToolId::BunMirror)?;

        let path = self.ctx.gctx.bunfig_path();
        let mut doc = read_toml(&path)?;
        let registry = self.ctx.registry.bun.as_str();

        match doc.get_mut("install").and_then(Item::as_table_like_mut) {
            Some(install) => {
                install.insert("registry", value(registry));
            }
            None => {
                let mut install = Table::new();
                install.insert("registry", value(registry));
                doc.insert("install", Item::Table(install));
            }
        }

        write_config(&path, &doc)?;
        tracing::info!("set Bun registry to {} in {}", registry, path.display());
        Ok(())
    }
}

impl Installer for BunMirrorInstaller {
    fn tool(&self) -> ToolId {
        ToolId::BunMirror
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        self.current_registry()
            .is_some_and(|current| same_url(&current, &self.ctx.registry.bun))
    }

    fn detect_version(&self) -> Option<String> {
        self.current_registry()
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.ctx.gctx.bunfig_path()).filter(|p| p.is_file())
    }

    fn perform_install(&self) -> Result<()> {
        self.configure()
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.configure()
    }
}

/// Writes the PyPI index and python-install mirror to `~/.config/uv/uv.toml`.
pub struct UvMirrorInstaller {
    ctx: InstallerContext,
}

impl UvMirrorInstaller {
    pub fn new(ctx: InstallerContext) -> Self {
        UvMirrorInstaller { ctx }
    }

    fn is_configured(&self, doc: &DocumentMut) -> bool {
        let registry = &self.ctx.registry;

        let python_install = doc
            .get("python-install-mirror")
            .and_then(Item::as_str)
            .is_some_and(|m| same_url(m, &registry.python_install));

        let index = doc
            .get("index")
            .and_then(Item::as_array_of_tables)
            .is_some_and(|indexes| {
                indexes.iter().any(|t| {
                    t.get("url")
                        .and_then(Item::as_str)
                        .is_some_and(|url| same_url(url, &registry.pypi))
                })
            });

        python_install && index
    }

    fn configure(&self) -> Result<()> {
        self.ctx.require("uv", ToolId::UvMirror)?;

        let path = self.ctx.gctx.uv_config_path();
        let mut doc = read_toml(&path)?;
        let registry = &self.ctx.registry;

        doc.insert("python-install-mirror", value(registry.python_install.as_str()));

        let mut index = Table::new();
        index.insert("url", value(registry.pypi.as_str()));
        let mut indexes = ArrayOfTables::new();
        indexes.push(index);
        doc.insert("index", Item::ArrayOfTables(indexes));

        write_config(&path, &doc)?;
        tracing::info!("wrote uv mirrors to {}", path.display());
        Ok(())
    }
}

impl Installer for UvMirrorInstaller {
    fn tool(&self) -> ToolId {
        ToolId::UvMirror
    }

    fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn verify(&self) -> bool {
        peek_toml(&self.ctx.gctx.uv_config_path()).is_some_and(|doc| self.is_configured(&doc))
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.ctx.gctx.uv_config_path()).filter(|p| p.is_file())
    }

    fn perform_install(&self) -> Result<()> {
        self.configure()
    }

    fn perform_upgrade(&self) -> Result<()> {
        self.configure()
    }
}
