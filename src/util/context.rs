//! Global context for kickstart operations.
//!
//! Provides the user's home directory, the working directory, and the
//! well-known paths derived from them (config files, tool install dirs,
//! mirror config files). Everything that touches `$HOME` goes through here so
//! tests can point it at a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::util::config::{ConfigPaths, CONFIG_FILE_NAME};

/// Home and working directories, and the paths derived from them.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// User home directory
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext for the current user and directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .context("failed to determine home directory")?;

        Ok(Self::with_dirs(home, cwd))
    }

    /// Create a GlobalContext with explicit home and working directories.
    pub fn with_dirs(home: PathBuf, cwd: PathBuf) -> Self {
        GlobalContext { cwd, home }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the user's home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `~/.kickstartrc`
    pub fn user_config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }

    /// `./.kickstartrc`
    pub fn project_config_path(&self) -> PathBuf {
        self.cwd.join(CONFIG_FILE_NAME)
    }

    /// Config locations in resolution order, with an optional `--config` file.
    pub fn config_paths(&self, cli: Option<&Path>) -> ConfigPaths {
        ConfigPaths {
            user: self.user_config_path(),
            project: self.project_config_path(),
            cli: cli.map(|p| self.cwd.join(p)),
        }
    }

    /// `~/.nvm`
    pub fn nvm_dir(&self) -> PathBuf {
        self.home.join(".nvm")
    }

    /// `~/.nvm/nvm.sh`
    pub fn nvm_sh(&self) -> PathBuf {
        self.nvm_dir().join("nvm.sh")
    }

    /// `bin` directories of nvm-installed Node releases, newest first.
    pub fn nvm_node_bin_dirs(&self) -> Vec<PathBuf> {
        let versions = self.nvm_dir().join("versions").join("node");
        let Ok(entries) = fs::read_dir(&versions) else {
            return Vec::new();
        };

        let mut releases: Vec<(Vec<u64>, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let bin = entry.path().join("bin");
                bin.is_dir().then(|| (version_key(&name), bin))
            })
            .collect();
        releases.sort_by(|a, b| b.0.cmp(&a.0));
        releases.into_iter().map(|(_, bin)| bin).collect()
    }

    /// `~/.bun/bin`
    pub fn bun_bin_dir(&self) -> PathBuf {
        self.home.join(".bun").join("bin")
    }

    /// `~/.local/bin`, where uv, claude and uv-managed tools land.
    pub fn local_bin_dir(&self) -> PathBuf {
        self.home.join(".local").join("bin")
    }

    /// Install locations of earlier tools, which the inherited `PATH` may
    /// not include until a new shell is started. Only existing directories
    /// are returned, so the list grows as a run progresses.
    pub fn tool_bin_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.bun_bin_dir(), self.local_bin_dir()];
        dirs.extend(self.nvm_node_bin_dirs());
        dirs.retain(|dir| dir.is_dir());
        dirs
    }

    /// `~/miniconda3`
    pub fn conda_dir(&self) -> PathBuf {
        self.home.join("miniconda3")
    }

    /// `~/.bunfig.toml`
    pub fn bunfig_path(&self) -> PathBuf {
        self.home.join(".bunfig.toml")
    }

    /// `~/.config/uv/uv.toml`
    pub fn uv_config_path(&self) -> PathBuf {
        self.home.join(".config").join("uv").join("uv.toml")
    }
}

/// Numeric components of a release name like `v22.11.0`.
fn version_key(name: &str) -> Vec<u64> {
    name.trim_start_matches('v')
        .split('.')
        .map_while(|part| part.parse().ok())
        .collect()
}
