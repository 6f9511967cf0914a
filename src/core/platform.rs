//! Platform detection: operating system, CPU architecture and login shell.
//!
//! [`PlatformInfo`] is computed once per process and handed by reference to
//! the orchestrator and every installer.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Macos,
    Linux,
    Unsupported,
}

impl Os {
    /// Map a `std::env::consts::OS` value.
    pub fn from_consts(os: &str) -> Self {
        match os {
            "macos" => Os::Macos,
            "linux" => Os::Linux,
            _ => Os::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Macos => "macos",
            Os::Linux => "linux",
            Os::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm64,
    X86_64,
    Unsupported,
}

impl Arch {
    /// Map a `std::env::consts::ARCH` value.
    pub fn from_consts(arch: &str) -> Self {
        match arch {
            "aarch64" | "arm64" => Arch::Arm64,
            "x86_64" | "amd64" => Arch::X86_64,
            _ => Arch::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
            Arch::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Login shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    Unknown,
}

impl ShellKind {
    /// Detect the shell from the value of `$SHELL` (e.g. `/bin/zsh`).
    pub fn from_shell_var(shell: Option<&str>) -> Self {
        let Some(shell) = shell else {
            return ShellKind::Unknown;
        };
        let name = Path::new(shell)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(shell);
        match name {
            "bash" => ShellKind::Bash,
            "zsh" => ShellKind::Zsh,
            "fish" => ShellKind::Fish,
            _ => ShellKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
            ShellKind::Unknown => "unknown",
        }
    }

    /// The rc file this shell reads, relative to `home`.
    ///
    /// Bash prefers `.bashrc` when it exists and falls back to `.bash_profile`.
    pub fn config_path(&self, home: &Path) -> PathBuf {
        match self {
            ShellKind::Bash => {
                let bashrc = home.join(".bashrc");
                if bashrc.exists() {
                    bashrc
                } else {
                    home.join(".bash_profile")
                }
            }
            ShellKind::Zsh => home.join(".zshrc"),
            ShellKind::Fish => home.join(".config").join("fish").join("config.fish"),
            ShellKind::Unknown => home.join(".profile"),
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only facts about the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub os: Os,
    pub arch: Arch,
    pub shell: ShellKind,
    pub shell_config_path: PathBuf,
}

impl PlatformInfo {
    /// Probe the current host, resolving the shell rc file under `home`.
    pub fn detect(home: &Path) -> Self {
        let shell_var = std::env::var("SHELL").ok();
        Self::from_parts(
            Os::from_consts(std::env::consts::OS),
            Arch::from_consts(std::env::consts::ARCH),
            ShellKind::from_shell_var(shell_var.as_deref()),
            home,
        )
    }

    /// Build platform info from already-known values.
    pub fn from_parts(os: Os, arch: Arch, shell: ShellKind, home: &Path) -> Self {
        PlatformInfo {
            os,
            arch,
            shell,
            shell_config_path: shell.config_path(home),
        }
    }

    /// Whether kickstart can install tools on this platform.
    ///
    /// Supported: macOS arm64, macOS x86_64 and Linux x86_64.
    pub fn is_supported(&self) -> bool {
        matches!(
            (self.os, self.arch),
            (Os::Macos, Arch::Arm64) | (Os::Macos, Arch::X86_64) | (Os::Linux, Arch::X86_64)
        )
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.os, self.arch, self.shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_os_arch_mapping() {
        assert_eq!(Os::from_consts("macos"), Os::Macos);
        assert_eq!(Os::from_consts("linux"), Os::Linux);
        assert_eq!(Os::from_consts("windows"), Os::Unsupported);
        assert_eq!(Arch::from_consts("aarch64"), Arch::Arm64);
        assert_eq!(Arch::from_consts("x86_64"), Arch::X86_64);
        assert_eq!(Arch::from_consts("riscv64"), Arch::Unsupported);
    }

    #[test]
    fn test_shell_from_var() {
        assert_eq!(ShellKind::from_shell_var(Some("/bin/zsh")), ShellKind::Zsh);
        assert_eq!(
            ShellKind::from_shell_var(Some("/usr/local/bin/fish")),
            ShellKind::Fish
        );
        assert_eq!(ShellKind::from_shell_var(Some("bash")), ShellKind::Bash);
        assert_eq!(ShellKind::from_shell_var(Some("/bin/tcsh")), ShellKind::Unknown);
        assert_eq!(ShellKind::from_shell_var(None), ShellKind::Unknown);
    }

    #[test]
    fn test_bash_config_path_prefers_bashrc() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            ShellKind::Bash.config_path(tmp.path()),
            tmp.path().join(".bash_profile")
        );

        std::fs::write(tmp.path().join(".bashrc"), "").unwrap();
        assert_eq!(
            ShellKind::Bash.config_path(tmp.path()),
            tmp.path().join(".bashrc")
        );
    }

    #[test]
    fn test_other_config_paths() {
        let home = Path::new("/home/dev");
        assert_eq!(ShellKind::Zsh.config_path(home), home.join(".zshrc"));
        assert_eq!(
            ShellKind::Fish.config_path(home),
            home.join(".config/fish/config.fish")
        );
        assert_eq!(ShellKind::Unknown.config_path(home), home.join(".profile"));
    }

    #[test]
    fn test_supported_platforms() {
        let home = Path::new("/home/dev");
        let supported = |os, arch| PlatformInfo::from_parts(os, arch, ShellKind::Zsh, home).is_supported();

        assert!(supported(Os::Macos, Arch::Arm64));
        assert!(supported(Os::Macos, Arch::X86_64));
        assert!(supported(Os::Linux, Arch::X86_64));
        assert!(!supported(Os::Linux, Arch::Arm64));
        assert!(!supported(Os::Unsupported, Arch::X86_64));
    }
}
