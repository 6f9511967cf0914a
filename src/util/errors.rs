//! Error taxonomy and process exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::tool::{OrderViolation, ToolId};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const ALL_TASKS_FAILED: i32 = 3;
    pub const PERMISSION_ERROR: i32 = 4;
    pub const DEPENDENCY_ERROR: i32 = 5;
    pub const USER_INTERRUPT: i32 = 130;
}

/// Errors kickstart reports to the user.
///
/// Configuration, platform and usage errors are fatal and raised before any
/// installer runs. `ToolInstall`, `Network`, `Permission` and `Dependency`
/// describe per-tool failures; the orchestrator turns them into failed
/// reports instead of aborting the run.
#[derive(Debug, Error)]
pub enum KickstartError {
    #[error("malformed config file {}: {message}", path.display())]
    ConfigFormat { path: PathBuf, message: String },

    #[error("invalid configuration: {}", errors.join("; "))]
    ConfigValidation {
        path: Option<PathBuf>,
        errors: Vec<String>,
    },

    #[error("unsupported platform: {os}/{arch}")]
    PlatformUnsupported { os: String, arch: String },

    #[error("failed to install `{tool}`: {reason}")]
    ToolInstall { tool: ToolId, reason: String },

    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("permission denied: cannot {operation} {}", path.display())]
    Permission { path: PathBuf, operation: String },

    #[error("`{required_by}` requires `{dependency}`, which is not available")]
    Dependency {
        dependency: String,
        required_by: ToolId,
    },

    #[error("install order is inconsistent: {0}")]
    InstallOrder(OrderViolation),

    #[error("{0}")]
    Usage(String),

    #[error("interrupted")]
    Interrupted,
}

impl KickstartError {
    /// Exit code the process should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            KickstartError::ConfigFormat { .. } | KickstartError::ConfigValidation { .. } => {
                exit_code::CONFIG_ERROR
            }
            KickstartError::Permission { .. } => exit_code::PERMISSION_ERROR,
            KickstartError::Dependency { .. } => exit_code::DEPENDENCY_ERROR,
            KickstartError::Interrupted => exit_code::USER_INTERRUPT,
            KickstartError::PlatformUnsupported { .. }
            | KickstartError::ToolInstall { .. }
            | KickstartError::Network { .. }
            | KickstartError::InstallOrder(_)
            | KickstartError::Usage(_) => exit_code::GENERAL_ERROR,
        }
    }

    /// Recovery steps the user can try.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            KickstartError::ConfigFormat { .. } => vec![
                "Check that the file is valid YAML (indentation, colons, quoting)".to_string(),
                suggestions::CONFIG_DOCS.to_string(),
            ],
            KickstartError::ConfigValidation { .. } => vec![
                format!("Known tools: {}", ToolId::known_names()),
                "`install_via` must be one of: bun, npm, brew".to_string(),
                suggestions::CONFIG_DOCS.to_string(),
            ],
            KickstartError::PlatformUnsupported { .. } => vec![
                "Supported platforms: macOS arm64, macOS x86_64, Linux x86_64".to_string(),
                "Run kickstart on a supported platform".to_string(),
            ],
            KickstartError::ToolInstall { tool, .. } => vec![
                "Check your network connection".to_string(),
                suggestions::RETRY_SINGLE.replace("<tool>", tool.as_str()),
                format!("Install {} manually", tool.display_name()),
                suggestions::DISABLE_TOOL.replace("<tool>", tool.as_str()),
            ],
            KickstartError::Network { .. } => vec![
                "Check your network connection".to_string(),
                suggestions::USE_MIRRORS.to_string(),
                suggestions::VERBOSE.to_string(),
            ],
            KickstartError::Permission { .. } => vec![
                "Check the owner and mode of the file or directory".to_string(),
                "Avoid running kickstart with sudo; fix ownership instead".to_string(),
            ],
            KickstartError::Dependency {
                dependency,
                required_by,
            } => vec![
                format!("Install `{}` first, then run kickstart again", dependency),
                suggestions::DISABLE_TOOL.replace("<tool>", required_by.as_str()),
            ],
            KickstartError::InstallOrder(_) => Vec::new(),
            KickstartError::Usage(_) => vec!["Run `kickstart --help` for usage".to_string()],
            KickstartError::Interrupted => Vec::new(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            KickstartError::ConfigFormat { path, message } => {
                Diagnostic::error("config file is not valid YAML")
                    .with_location(path.clone())
                    .with_context(message.clone())
            }
            KickstartError::ConfigValidation { path, errors } => {
                let mut diag = Diagnostic::error("invalid configuration");
                if let Some(path) = path {
                    diag = diag.with_location(path.clone());
                }
                errors
                    .iter()
                    .fold(diag, |diag, err| diag.with_context(err.clone()))
            }
            other => Diagnostic::error(other.to_string()),
        };
        diag.with_suggestions(self.suggestions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let format = KickstartError::ConfigFormat {
            path: PathBuf::from(".kickstartrc"),
            message: "bad indent".into(),
        };
        assert_eq!(format.exit_code(), exit_code::CONFIG_ERROR);

        let platform = KickstartError::PlatformUnsupported {
            os: "windows".into(),
            arch: "x86_64".into(),
        };
        assert_eq!(platform.exit_code(), exit_code::GENERAL_ERROR);
        assert_eq!(KickstartError::Interrupted.exit_code(), 130);
        assert_eq!(
            KickstartError::Permission {
                path: PathBuf::from("/etc"),
                operation: "write".into()
            }
            .exit_code(),
            exit_code::PERMISSION_ERROR
        );
    }

    #[test]
    fn test_validation_diagnostic_lists_every_error() {
        let err = KickstartError::ConfigValidation {
            path: Some(PathBuf::from("/work/.kickstartrc")),
            errors: vec![
                "unknown tool name: rustup".into(),
                "tools.codex.install_via: invalid value 'pip'".into(),
            ],
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("unknown tool name: rustup"));
        assert!(output.contains("invalid value 'pip'"));
        assert!(output.contains("--> /work/.kickstartrc"));
        assert!(output.contains("Known tools:"));
    }

    #[test]
    fn test_tool_install_suggestions_name_the_tool() {
        let err = KickstartError::ToolInstall {
            tool: ToolId::Codex,
            reason: "npm exited with status 1".into(),
        };
        let suggestions = err.suggestions();
        assert!(suggestions.iter().any(|s| s.contains("kickstart install codex")));
        assert!(suggestions.iter().any(|s| s.contains("tools.codex.enabled")));
    }
}
