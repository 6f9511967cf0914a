//! Test utilities and mocks for kickstart unit tests.
//!
//! [`MockRunner`] stands in for the host: it answers commands from scripted
//! expectations, reports which programs are "on PATH", and fakes downloads.
//! Every call is recorded so tests can assert on exactly what an installer
//! tried to run.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = MockRunner::new();
//! runner
//!     .with_program("bun")
//!     .expect("bun --version", CommandOutput::ok("1.1.0"));
//!
//! // hand `Arc::new(runner)` to an InstallerContext...
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::core::platform::{Arch, Os, PlatformInfo, ShellKind};
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};

/// Pattern for matching commands in [`MockRunner`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full command line.
    Exact(String),
    /// Match if the command line starts with prefix.
    StartsWith(String),
    /// Match if the command line contains substring.
    Contains(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command line.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Pattern to match against command lines.
    pub pattern: CommandPattern,
    /// Output to return when matched.
    pub output: CommandOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
}

impl CommandExpectation {
    /// Create a new expectation.
    pub fn new(pattern: CommandPattern, output: CommandOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Check if this expectation can still be used.
    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
    default_output: Option<CommandOutput>,
    programs: Vec<String>,
    downloads: Vec<String>,
    failing_downloads: Vec<String>,
    creates: Vec<(String, PathBuf)>,
}

/// Scripted [`CommandRunner`].
///
/// Expectations are consulted in insertion order; the first available match
/// wins. Commands with no match get the default output, or an error when no
/// default is set.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    /// Create a new mock runner with nothing on PATH.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an expectation for an exact command line.
    pub fn expect(&self, cmd: &str, output: CommandOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command line starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: CommandOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command line containing a substring.
    pub fn expect_contains(&self, substring: &str, output: CommandOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.state().expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: CommandOutput) -> &Self {
        self.state().default_output = Some(output);
        self
    }

    /// Make `which(name)` resolve to `/usr/local/bin/<name>`.
    pub fn with_program(&self, name: &str) -> &Self {
        self.state().programs.push(name.to_string());
        self
    }

    /// When a command containing `substring` runs, leave an executable stub
    /// at `path`, the way an install script drops a binary into `$HOME`.
    pub fn creates(&self, substring: &str, path: impl AsRef<Path>) -> &Self {
        self.state()
            .creates
            .push((substring.to_string(), path.as_ref().to_path_buf()));
        self
    }

    /// Make downloads of URLs starting with `prefix` fail.
    pub fn fail_download(&self, prefix: &str) -> &Self {
        self.state().failing_downloads.push(prefix.to_string());
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded command lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.state().calls.iter().filter(|c| c.contains(needle)).count()
    }

    /// Every URL a download was attempted for, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.state().downloads.clone()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        for (i, exp) in self.state().expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder, _timeout: Duration) -> Result<CommandOutput> {
        let full_cmd = cmd.display_command();
        let mut state = self.state();
        state.calls.push(full_cmd.clone());

        for (substring, path) in &state.creates {
            if full_cmd.contains(substring.as_str()) {
                write_stub_executable(path);
            }
        }

        for exp in &mut state.expectations {
            if exp.pattern.matches(&full_cmd) && exp.available() {
                exp.used += 1;
                return Ok(exp.output.clone());
            }
        }

        if let Some(ref default) = state.default_output {
            return Ok(default.clone());
        }

        bail!("unexpected command: {}", full_cmd)
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        let state = self.state();
        state
            .programs
            .iter()
            .any(|p| p == program)
            .then(|| PathBuf::from("/usr/local/bin").join(program))
    }

    fn download(&self, url: &str, dest: &Path, _timeout: Duration) -> Result<()> {
        let failing = {
            let mut state = self.state();
            state.downloads.push(url.to_string());
            state.failing_downloads.iter().any(|p| url.starts_with(p))
        };
        if failing {
            bail!("connection reset while fetching {}", url);
        }
        crate::util::fs::write_atomic(dest, b"#!/bin/sh\nexit 0\n")
    }
}

/// Write an executable shell stub at `path`, creating parent directories.
pub fn write_stub_executable(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, "#!/bin/sh\nexit 0\n");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755));
    }
}

/// A supported Linux/bash platform rooted at `home`.
pub fn linux_platform(home: &Path) -> PlatformInfo {
    PlatformInfo::from_parts(Os::Linux, Arch::X86_64, ShellKind::Bash, home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_runner_matching() {
        let runner = MockRunner::new();
        runner
            .expect("bun --version", CommandOutput::ok("1.1.0\n"))
            .expect_prefix("npm ", CommandOutput::failed(1, "boom"));

        let out = runner
            .run(&ProcessBuilder::new("bun").arg("--version"), Duration::ZERO)
            .unwrap();
        assert_eq!(out.stdout, "1.1.0\n");

        let out = runner
            .run(&ProcessBuilder::new("npm").arg("ls"), Duration::ZERO)
            .unwrap();
        assert_eq!(out.status, Some(1));

        assert!(runner
            .run(&ProcessBuilder::new("uv").arg("--version"), Duration::ZERO)
            .is_err());
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(runner.count("--version"), 2);
    }

    #[test]
    fn test_limited_expectation_falls_through() {
        let runner = MockRunner::new();
        runner
            .expect_pattern(
                CommandExpectation::new(
                    CommandPattern::Any,
                    CommandOutput::failed(1, "first"),
                )
                .times(1),
            )
            .set_default(CommandOutput::ok("later"));

        let cmd = ProcessBuilder::new("true");
        assert_eq!(runner.run(&cmd, Duration::ZERO).unwrap().status, Some(1));
        assert_eq!(runner.run(&cmd, Duration::ZERO).unwrap().stdout, "later");
        runner.verify().unwrap();
    }

    #[test]
    fn test_creates_leaves_stub_behind() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join(".bun").join("bin").join("bun");
        let runner = MockRunner::new();
        runner
            .creates("bun.sh/install", &bin)
            .set_default(CommandOutput::ok(""));

        runner
            .run(&ProcessBuilder::new("true"), Duration::ZERO)
            .unwrap();
        assert!(!bin.exists());

        runner
            .run(&ProcessBuilder::shell("curl -fsSL https://bun.sh/install | bash"), Duration::ZERO)
            .unwrap();
        assert!(bin.is_file());
    }

    #[test]
    fn test_which_and_download() {
        let tmp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.with_program("bun").fail_download("https://bad.");

        assert_eq!(
            runner.which("bun"),
            Some(PathBuf::from("/usr/local/bin/bun"))
        );
        assert_eq!(runner.which("npm"), None);

        let dest = tmp.path().join("install.sh");
        runner
            .download("https://good.example/install.sh", &dest, Duration::ZERO)
            .unwrap();
        assert!(dest.exists());
        assert!(runner
            .download("https://bad.example/x", &dest, Duration::ZERO)
            .is_err());
        assert_eq!(runner.downloads().len(), 2);
    }
}
