//! Subprocess execution utilities.
//!
//! Installers never spawn processes directly. They describe a command with
//! [`ProcessBuilder`] and hand it to a [`CommandRunner`]; [`SystemRunner`]
//! executes it on the host with a timeout, while tests substitute a scripted
//! runner.

use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

/// Default timeout for a single command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Run a script through `sh -c`, for pipelines like `curl ... | bash`.
    pub fn shell(script: impl AsRef<str>) -> Self {
        ProcessBuilder::new("sh").arg("-c").arg(script.as_ref())
    }

    /// Run a script through `bash -c` after sourcing `nvm.sh`.
    pub fn with_nvm(nvm_sh: &Path, script: impl AsRef<str>) -> Self {
        ProcessBuilder::new("bash").arg("-c").arg(format!(
            "source {} && {}",
            nvm_sh.display(),
            script.as_ref()
        ))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Value of an environment variable set on this command.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        // Own process group: a timeout can take down the whole pipeline, and
        // the terminal's Ctrl-C reaches kickstart but not the running command.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }

    /// Execute the command, killing it if it runs past `timeout`.
    pub fn exec_with_timeout(&self, timeout: Duration) -> Result<CommandOutput> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = wait_with_deadline(&mut child, timeout)
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        if timed_out {
            // A process that left the group may still hold the pipes open.
            return Ok(CommandOutput::timeout());
        }

        Ok(CommandOutput {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            timed_out,
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Read a child pipe to completion on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Poll a child until it exits or the deadline passes; a late child is
/// killed together with everything it spawned.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<(Option<i32>, bool)> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            kill_process_group(child);
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    match i32::try_from(child.id()) {
        // SAFETY: the child leads its own group (`process_group(0)`), so a
        // negative pid signals exactly that group.
        Ok(pgid) => unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        },
        Err(_) => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

/// Captured result of a finished (or timed out) command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal or the timeout
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(0),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            status: Some(code),
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    /// An output for a command that ran past its timeout.
    pub fn timeout() -> Self {
        CommandOutput {
            timed_out: true,
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.status == Some(0)
    }

    /// The exit code, with `-1` standing in for "no exit code".
    pub fn exit_code(&self) -> i32 {
        self.status.unwrap_or(-1)
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr).trim().to_string()
    }

    /// Require success, describing the failure otherwise.
    pub fn check(self, cmd: &ProcessBuilder, timeout: Duration) -> Result<Self> {
        if self.timed_out {
            bail!(
                "`{}` timed out after {}s",
                cmd.display_command(),
                timeout.as_secs()
            );
        }
        if !self.success() {
            let detail = self.stderr.trim();
            let detail = if detail.is_empty() {
                self.stdout.trim()
            } else {
                detail
            };
            bail!(
                "`{}` failed with exit code {}\n{}",
                cmd.display_command(),
                self.exit_code(),
                detail
            );
        }
        Ok(self)
    }
}

/// Executes commands and network transfers on behalf of installers.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion or until `timeout` passes.
    ///
    /// A non-zero exit is not an error here; only failing to spawn is.
    fn run(&self, cmd: &ProcessBuilder, timeout: Duration) -> Result<CommandOutput>;

    /// Locate an executable on the inherited `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Download `url` to `dest`.
    fn download(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder, timeout: Duration) -> Result<CommandOutput> {
        tracing::debug!("running `{}`", cmd.display_command());
        cmd.exec_with_timeout(timeout)
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }

    fn download(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()> {
        tracing::debug!("downloading {} to {}", url, dest.display());

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let response = client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("bad response from {}", url))?;

        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {}", url))?;
        if bytes.is_empty() {
            bail!("empty response from {}", url);
        }

        crate::util::fs::write_atomic(dest, &bytes)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable in `dirs` only.
pub fn find_executable_in(name: &str, dirs: &[PathBuf], cwd: &Path) -> Option<PathBuf> {
    if dirs.is_empty() {
        return None;
    }
    let paths = env::join_paths(dirs).ok()?;
    which::which_in(name, Some(paths), cwd).ok()
}

/// `dirs` ahead of the inherited `PATH`, as a `PATH` value.
pub fn search_path(dirs: &[PathBuf]) -> Option<OsString> {
    let inherited = env::var_os("PATH");
    let inherited = inherited.iter().flat_map(env::split_paths);
    env::join_paths(dirs.iter().cloned().chain(inherited)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_captures_output() {
        let output = ProcessBuilder::new("echo")
            .arg("hello")
            .exec_with_timeout(DEFAULT_TIMEOUT)
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_exec_reports_exit_code() {
        let output = ProcessBuilder::shell("echo oops >&2; exit 3")
            .exec_with_timeout(DEFAULT_TIMEOUT)
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_exec_times_out() {
        let started = Instant::now();
        let output = ProcessBuilder::new("sleep")
            .arg("5")
            .exec_with_timeout(Duration::from_millis(200))
            .unwrap();

        assert!(output.timed_out);
        assert!(!output.success());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_the_whole_pipeline() {
        let tmp = tempfile::TempDir::new().unwrap();
        let marker = tmp.path().join("late");
        let script = format!(
            "sleep 0.5 | sh -c 'sleep 1; echo late > {}'",
            marker.display()
        );

        let output = ProcessBuilder::shell(script)
            .exec_with_timeout(Duration::from_millis(200))
            .unwrap();
        assert!(output.timed_out);

        thread::sleep(Duration::from_secs(2));
        assert!(!marker.exists(), "pipeline kept running after the timeout");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runs_in_its_own_process_group() {
        let output = ProcessBuilder::shell("ps -o pgid= -p $$")
            .exec_with_timeout(DEFAULT_TIMEOUT)
            .unwrap();
        if !output.success() {
            // No usable `ps` on this host.
            return;
        }

        // SAFETY: getpgrp has no preconditions.
        let ours = unsafe { libc::getpgrp() };
        assert_ne!(output.stdout.trim(), ours.to_string());
    }

    #[test]
    fn test_find_executable_in_given_dirs_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let tool = bin.join("kickstart-fake-tool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        assert_eq!(
            find_executable_in("kickstart-fake-tool", &[bin.clone()], tmp.path()),
            Some(tool)
        );
        assert_eq!(find_executable_in("kickstart-fake-tool", &[], tmp.path()), None);
        assert_eq!(find_executable("kickstart-fake-tool"), None);

        let path = search_path(&[bin.clone()]).unwrap();
        assert_eq!(env::split_paths(&path).next(), Some(bin));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("npm").args(["config", "set", "registry", "https://r/"]);
        assert_eq!(pb.display_command(), "npm config set registry https://r/");

        let sh = ProcessBuilder::shell("curl -fsSL https://bun.sh/install | bash");
        assert_eq!(
            sh.display_command(),
            "sh -c curl -fsSL https://bun.sh/install | bash"
        );
    }

    #[test]
    fn test_check_describes_failure() {
        let cmd = ProcessBuilder::new("uv").arg("--version");
        let err = CommandOutput::failed(127, "uv: not found")
            .check(&cmd, DEFAULT_TIMEOUT)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`uv --version` failed with exit code 127"));
        assert!(msg.contains("uv: not found"));

        let err = CommandOutput::timeout()
            .check(&cmd, Duration::from_secs(30))
            .unwrap_err();
        assert!(err.to_string().contains("timed out after 30s"));
    }
}
