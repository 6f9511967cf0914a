//! Tool installers.
//!
//! Every tool in [`INSTALL_ORDER`](crate::core::tool::INSTALL_ORDER) has one
//! [`Installer`] implementation. Installers describe *what* to run; the
//! [`InstallerContext`] they are constructed with decides *how*: commands go
//! through its [`CommandRunner`], network steps through the retry policy, and
//! dry runs short-circuit before anything is mutated.
//!
//! Key principle: construction never does I/O. Detection happens lazily in
//! [`Installer::verify`], which is read-only and safe to call at any time,
//! including in dry-run mode.

mod bmad;
mod bun;
mod claude_code;
mod codex;
mod conda;
mod mirror;
mod node;
mod nvm;
mod spec_kit;
mod uv;

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::platform::PlatformInfo;
use crate::core::report::InstallReport;
use crate::core::tool::ToolId;
use crate::util::config::{Config, RegistryConfig, ToolConfig};
use crate::util::context::GlobalContext;
use crate::util::errors::KickstartError;
use crate::util::process::{
    find_executable_in, search_path, CommandOutput, CommandRunner, ProcessBuilder, DEFAULT_TIMEOUT,
};
use crate::util::retry::{with_retry, RetryPolicy, Sleeper, ThreadSleeper};

pub use bmad::BmadInstaller;
pub use bun::BunInstaller;
pub use claude_code::ClaudeCodeInstaller;
pub use codex::CodexInstaller;
pub use conda::CondaInstaller;
pub use mirror::{BunMirrorInstaller, NpmMirrorInstaller, UvMirrorInstaller};
pub use node::NodeInstaller;
pub use nvm::NvmInstaller;
pub use spec_kit::SpecKitInstaller;
pub use uv::UvInstaller;

/// Timeout for steps that fetch and run remote installers.
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(300);

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?(\d+\.\d+\.\d+(?:\.\d+)?)").expect("valid version pattern")
});

/// Everything an installer needs from the outside world.
///
/// One context is built per tool, carrying that tool's resolved
/// [`ToolConfig`]. It is cheap to clone; the runner and sleeper are shared.
#[derive(Clone)]
pub struct InstallerContext {
    /// Home and working directories
    pub gctx: GlobalContext,

    /// Host facts, computed once per process
    pub platform: PlatformInfo,

    /// Resolved settings for this tool
    pub config: ToolConfig,

    /// Registry mirrors
    pub registry: RegistryConfig,

    /// Executes commands and downloads
    pub runner: Arc<dyn CommandRunner>,

    /// Waits between network retries
    pub sleeper: Arc<dyn Sleeper>,

    /// Retry budget for network steps
    pub retry: RetryPolicy,

    /// Simulate mutations instead of performing them
    pub dry_run: bool,
}

impl InstallerContext {
    /// Create a context with the default retry policy and a real sleeper.
    pub fn new(
        gctx: GlobalContext,
        platform: PlatformInfo,
        config: ToolConfig,
        registry: RegistryConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        InstallerContext {
            gctx,
            platform,
            config,
            registry,
            runner,
            sleeper: Arc::new(ThreadSleeper),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }

    /// Build the context for one tool out of the resolved configuration.
    pub fn for_tool(&self, tool: ToolId, config: &Config) -> Self {
        InstallerContext {
            config: config.tool(tool),
            registry: config.registry.clone(),
            ..self.clone()
        }
    }

    /// Set the sleeper used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn home(&self) -> &Path {
        self.gctx.home()
    }

    /// Run a command once with the default timeout, requiring success.
    pub fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput> {
        self.run_with_timeout(cmd, DEFAULT_TIMEOUT)
    }

    /// Run a command once, requiring success.
    pub fn run_with_timeout(&self, cmd: &ProcessBuilder, timeout: Duration) -> Result<CommandOutput> {
        tracing::debug!("running `{}`", cmd.display_command());
        self.runner.run(&self.prepare(cmd), timeout)?.check(cmd, timeout)
    }

    /// The command as it is actually spawned: earlier tools' install
    /// directories go ahead of the inherited `PATH`, so a tool installed a
    /// moment ago is usable without a new shell.
    pub fn prepare(&self, cmd: &ProcessBuilder) -> ProcessBuilder {
        let dirs = self.gctx.tool_bin_dirs();
        if dirs.is_empty() || cmd.env_var("PATH").is_some() {
            return cmd.clone();
        }
        match search_path(&dirs) {
            Some(path) => cmd.clone().env("PATH", path.to_string_lossy()),
            None => cmd.clone(),
        }
    }

    /// Run a network-bound command under the retry policy.
    ///
    /// A non-zero exit or a timeout counts as a failed attempt. The last
    /// failure is returned once the budget is spent.
    pub fn run_network(&self, cmd: &ProcessBuilder, timeout: Duration) -> Result<CommandOutput> {
        let prepared = self.prepare(cmd);
        with_retry(&self.retry, self.sleeper.as_ref(), |attempt| {
            tracing::debug!("attempt {}: `{}`", attempt, cmd.display_command());
            self.runner.run(&prepared, timeout)?.check(cmd, timeout)
        })
    }

    /// Download `url` to `dest` under the retry policy.
    pub fn download(&self, url: &str, dest: &Path) -> Result<()> {
        with_retry(&self.retry, self.sleeper.as_ref(), |_| {
            self.runner.download(url, dest, NETWORK_TIMEOUT)
        })
        .map_err(|e| KickstartError::Network {
            url: url.to_string(),
            reason: format!("{:#}", e),
        })?;
        Ok(())
    }

    /// Run a read-only probe; `None` unless it exits successfully.
    pub fn probe(&self, cmd: &ProcessBuilder) -> Option<CommandOutput> {
        match self.runner.run(&self.prepare(cmd), DEFAULT_TIMEOUT) {
            Ok(output) if output.success() => Some(output),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("probe `{}` failed: {:#}", cmd.display_command(), e);
                None
            }
        }
    }

    /// Version reported by a probe command.
    pub fn probe_version(&self, cmd: &ProcessBuilder) -> Option<String> {
        self.probe(cmd).and_then(|out| parse_version(&out.combined()))
    }

    /// Locate an executable, looking in earlier tools' install directories
    /// before the inherited `PATH`.
    pub fn which(&self, program: &str) -> Option<PathBuf> {
        find_executable_in(program, &self.gctx.tool_bin_dirs(), self.gctx.cwd())
            .or_else(|| self.runner.which(program))
    }

    /// Locate an executable another tool needs, or fail with a dependency error.
    pub fn require(&self, program: &str, required_by: ToolId) -> Result<PathBuf> {
        self.which(program).ok_or_else(|| {
            KickstartError::Dependency {
                dependency: program.to_string(),
                required_by,
            }
            .into()
        })
    }

    /// A binary is usable when it can be located and `<bin> --version` succeeds.
    pub fn binary_works(&self, program: &str) -> bool {
        self.which(program).is_some()
            && self
                .probe(&ProcessBuilder::new(program).arg("--version"))
                .is_some()
    }

    /// Version of a located binary, from `<bin> --version`.
    pub fn binary_version(&self, program: &str) -> Option<String> {
        self.which(program)?;
        self.probe_version(&ProcessBuilder::new(program).arg("--version"))
    }

    /// Temporary directory for downloaded installer scripts.
    pub fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        tempfile::Builder::new()
            .prefix("kickstart-")
            .tempdir()
            .context("failed to create temporary directory")
    }
}

/// Extract a version number from command output.
///
/// Returns the first `MAJOR.MINOR.PATCH[.BUILD]` found (without a leading
/// `v`), falling back to the first non-empty line.
pub fn parse_version(output: &str) -> Option<String> {
    if let Some(caps) = VERSION_RE.captures(output) {
        return Some(caps[1].to_string());
    }
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
}

/// Package manager used for npm-distributed tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Bun,
    Npm,
    Brew,
}

impl PackageManager {
    /// `install_via` when configured, else bun when available, else npm.
    pub fn select(ctx: &InstallerContext) -> Self {
        match ctx.config.install_via.as_deref().map(str::to_lowercase).as_deref() {
            Some("bun") => PackageManager::Bun,
            Some("npm") => PackageManager::Npm,
            Some("brew") => PackageManager::Brew,
            _ if ctx.which("bun").is_some() => PackageManager::Bun,
            _ => PackageManager::Npm,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Bun => "bun",
            PackageManager::Npm => "npm",
            PackageManager::Brew => "brew",
        }
    }
}

/// Install, upgrade and detect one tool.
///
/// Implementors supply detection and the raw install/upgrade steps; the
/// provided methods add idempotency, dry-run handling and report building.
pub trait Installer: Send + Sync {
    /// Which tool this installer manages.
    fn tool(&self) -> ToolId;

    /// The context this installer was constructed with.
    fn context(&self) -> &InstallerContext;

    /// Whether the tool is present and working. Must not mutate anything.
    fn verify(&self) -> bool;

    /// Installed version, when it can be detected.
    fn detect_version(&self) -> Option<String> {
        None
    }

    /// Where the tool lives, for status output.
    fn location(&self) -> Option<PathBuf> {
        None
    }

    /// Perform the installation unconditionally.
    fn perform_install(&self) -> Result<()>;

    /// Perform the upgrade; the tool is known to be installed.
    fn perform_upgrade(&self) -> Result<()>;

    /// Install unless [`verify`](Installer::verify) already holds.
    fn install(&self) -> Result<InstallReport> {
        if self.verify() {
            tracing::info!("{} already installed", self.tool());
            return Ok(
                InstallReport::skipped(self.tool(), "already installed")
                    .with_version(self.detect_version()),
            );
        }
        self.reinstall()
    }

    /// Install without the verify short-circuit (`--force`).
    fn reinstall(&self) -> Result<InstallReport> {
        let tool = self.tool();
        if self.context().dry_run {
            return Ok(InstallReport::simulated(tool, install_verb(tool)));
        }

        self.perform_install()?;
        tracing::info!("{} {}", install_past(tool), tool);
        Ok(
            InstallReport::success(tool, format!("{} {}", install_past(tool), tool.display_name()))
                .with_version(self.detect_version()),
        )
    }

    /// Upgrade an installed tool.
    fn upgrade(&self) -> Result<InstallReport> {
        let tool = self.tool();
        if self.context().dry_run {
            return Ok(InstallReport::simulated(tool, "upgrade"));
        }

        self.perform_upgrade()?;
        tracing::info!("upgraded {}", tool);
        Ok(
            InstallReport::success(tool, format!("upgraded {}", tool.display_name()))
                .with_version(self.detect_version()),
        )
    }
}

fn install_verb(tool: ToolId) -> &'static str {
    if tool.is_mirror() {
        "configure"
    } else {
        "install"
    }
}

fn install_past(tool: ToolId) -> &'static str {
    if tool.is_mirror() {
        "configured"
    } else {
        "installed"
    }
}

/// Construct the installer for a tool.
pub fn create_installer(tool: ToolId, ctx: InstallerContext) -> Box<dyn Installer> {
    match tool {
        ToolId::Nvm => Box::new(NvmInstaller::new(ctx)),
        ToolId::Node => Box::new(NodeInstaller::new(ctx)),
        ToolId::Conda => Box::new(CondaInstaller::new(ctx)),
        ToolId::Bun => Box::new(BunInstaller::new(ctx)),
        ToolId::NpmMirror => Box::new(NpmMirrorInstaller::new(ctx)),
        ToolId::BunMirror => Box::new(BunMirrorInstaller::new(ctx)),
        ToolId::Uv => Box::new(UvInstaller::new(ctx)),
        ToolId::UvMirror => Box::new(UvMirrorInstaller::new(ctx)),
        ToolId::ClaudeCode => Box::new(ClaudeCodeInstaller::new(ctx)),
        ToolId::Codex => Box::new(CodexInstaller::new(ctx)),
        ToolId::SpecKit => Box::new(SpecKitInstaller::new(ctx)),
        ToolId::BmadMethod => Box::new(BmadInstaller::new(ctx)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::InstallerContext;
    use crate::test_support::{linux_platform, MockRunner};
    use crate::util::config::{RegistryConfig, ToolConfig};
    use crate::util::context::GlobalContext;
    use crate::util::retry::RecordingSleeper;

    /// A context rooted in a fresh temp home with a scripted runner.
    pub struct Harness {
        pub home: TempDir,
        pub runner: Arc<MockRunner>,
        pub sleeper: Arc<RecordingSleeper>,
        pub ctx: InstallerContext,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(ToolConfig::default())
        }

        pub fn with_config(config: ToolConfig) -> Self {
            let home = TempDir::new().unwrap();
            let runner = Arc::new(MockRunner::new());
            let sleeper = Arc::new(RecordingSleeper::new());
            let gctx = GlobalContext::with_dirs(home.path().to_path_buf(), home.path().to_path_buf());
            let ctx = InstallerContext::new(
                gctx,
                linux_platform(home.path()),
                config,
                RegistryConfig::default(),
                runner.clone(),
            )
            .with_sleeper(sleeper.clone());

            Harness {
                home,
                runner,
                sleeper,
                ctx,
            }
        }
    }
}
