//! Tool identifiers, install order and the dependency table.
//!
//! The set of tools is closed: every tool kickstart knows how to manage has a
//! [`ToolId`] variant, and [`INSTALL_ORDER`] lists all of them in the order
//! they are processed. The order is fixed by hand rather than derived, and
//! [`check_install_order`] asserts once at startup that it agrees with the
//! dependency table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tool managed by kickstart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolId {
    /// Node Version Manager
    Nvm,
    /// Node.js, installed through nvm
    Node,
    /// Miniconda
    Conda,
    /// Bun runtime and package manager
    Bun,
    /// npm registry mirror
    NpmMirror,
    /// Bun registry mirror (`~/.bunfig.toml`)
    BunMirror,
    /// uv Python package manager
    Uv,
    /// uv index and python-install mirrors (`~/.config/uv/uv.toml`)
    UvMirror,
    /// Claude Code CLI
    ClaudeCode,
    /// OpenAI Codex CLI
    Codex,
    /// GitHub Spec Kit (`specify`)
    SpecKit,
    /// BMad Method
    BmadMethod,
}

/// Every tool, in the order it is installed.
pub const INSTALL_ORDER: [ToolId; 12] = [
    ToolId::Nvm,
    ToolId::Node,
    ToolId::Conda,
    ToolId::Bun,
    ToolId::NpmMirror,
    ToolId::BunMirror,
    ToolId::Uv,
    ToolId::UvMirror,
    ToolId::ClaudeCode,
    ToolId::Codex,
    ToolId::SpecKit,
    ToolId::BmadMethod,
];

impl ToolId {
    /// Canonical (kebab-case) name, as used in config files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::Nvm => "nvm",
            ToolId::Node => "node",
            ToolId::Conda => "conda",
            ToolId::Bun => "bun",
            ToolId::NpmMirror => "npm-mirror",
            ToolId::BunMirror => "bun-mirror",
            ToolId::Uv => "uv",
            ToolId::UvMirror => "uv-mirror",
            ToolId::ClaudeCode => "claude-code",
            ToolId::Codex => "codex",
            ToolId::SpecKit => "spec-kit",
            ToolId::BmadMethod => "bmad-method",
        }
    }

    /// Human-readable name for progress output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolId::Nvm => "NVM",
            ToolId::Node => "Node.js",
            ToolId::Conda => "Conda",
            ToolId::Bun => "Bun",
            ToolId::NpmMirror => "npm mirror",
            ToolId::BunMirror => "Bun mirror",
            ToolId::Uv => "uv",
            ToolId::UvMirror => "uv mirror",
            ToolId::ClaudeCode => "Claude Code",
            ToolId::Codex => "Codex CLI",
            ToolId::SpecKit => "Spec Kit",
            ToolId::BmadMethod => "BMad Method",
        }
    }

    /// Tools that must appear before this one in [`INSTALL_ORDER`].
    pub fn dependencies(&self) -> &'static [ToolId] {
        match self {
            ToolId::Nvm | ToolId::Conda | ToolId::Bun | ToolId::Uv | ToolId::ClaudeCode => &[],
            ToolId::Node => &[ToolId::Nvm],
            ToolId::NpmMirror => &[ToolId::Node],
            ToolId::BunMirror => &[ToolId::Bun],
            ToolId::UvMirror => &[ToolId::Uv],
            ToolId::Codex => &[ToolId::Node],
            ToolId::SpecKit => &[ToolId::Uv],
            ToolId::BmadMethod => &[ToolId::Node],
        }
    }

    /// Whether this entry configures a registry mirror rather than installing a binary.
    pub fn is_mirror(&self) -> bool {
        matches!(
            self,
            ToolId::NpmMirror | ToolId::BunMirror | ToolId::UvMirror
        )
    }

    /// Position of this tool in [`INSTALL_ORDER`].
    pub fn order_index(&self) -> usize {
        INSTALL_ORDER
            .iter()
            .position(|t| t == self)
            .unwrap_or(INSTALL_ORDER.len())
    }

    /// Comma-separated list of every known tool name.
    pub fn known_names() -> String {
        INSTALL_ORDER
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = ToolIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        INSTALL_ORDER
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ToolIdParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolIdParseError(pub String);

impl fmt::Display for ToolIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown tool '{}', valid values: {}",
            self.0,
            ToolId::known_names()
        )
    }
}

impl std::error::Error for ToolIdParseError {}

/// A dependency that does not appear earlier in the install order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderViolation {
    pub tool: ToolId,
    pub dependency: ToolId,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` depends on `{}`, which is not installed before it",
            self.tool, self.dependency
        )
    }
}

/// Check an install order against the dependency table.
///
/// Every dependency of every tool must appear strictly earlier in `order`.
/// Returns all violations found.
pub fn check_order(order: &[ToolId]) -> Vec<OrderViolation> {
    let mut violations = Vec::new();
    for (idx, tool) in order.iter().enumerate() {
        for dep in tool.dependencies() {
            if !order[..idx].contains(dep) {
                violations.push(OrderViolation {
                    tool: *tool,
                    dependency: *dep,
                });
            }
        }
    }
    violations
}

/// Check [`INSTALL_ORDER`] against the dependency table.
pub fn check_install_order() -> Result<(), OrderViolation> {
    match check_order(&INSTALL_ORDER).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_order_is_consistent() {
        assert!(check_install_order().is_ok());
        for (idx, tool) in INSTALL_ORDER.iter().enumerate() {
            for dep in tool.dependencies() {
                assert!(
                    dep.order_index() < idx,
                    "{} must come before {}",
                    dep,
                    tool
                );
            }
        }
    }

    #[test]
    fn test_check_order_reports_violation() {
        let order = [ToolId::Node, ToolId::Nvm];
        let violations = check_order(&order);
        assert_eq!(
            violations,
            vec![OrderViolation {
                tool: ToolId::Node,
                dependency: ToolId::Nvm
            }]
        );
    }

    #[test]
    fn test_install_order_has_every_tool_once() {
        let mut seen = std::collections::HashSet::new();
        for tool in INSTALL_ORDER {
            assert!(seen.insert(tool), "{} listed twice", tool);
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn test_parse_tool_id() {
        assert_eq!("nvm".parse::<ToolId>().unwrap(), ToolId::Nvm);
        assert_eq!("claude-code".parse::<ToolId>().unwrap(), ToolId::ClaudeCode);
        assert_eq!("npm_mirror".parse::<ToolId>().unwrap(), ToolId::NpmMirror);
        assert_eq!("Spec-Kit".parse::<ToolId>().unwrap(), ToolId::SpecKit);
        assert!("rustup".parse::<ToolId>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tool in INSTALL_ORDER {
            assert_eq!(tool.to_string().parse::<ToolId>().unwrap(), tool);
        }
    }

    #[test]
    fn test_parse_error_lists_known_tools() {
        let err = "rustup".parse::<ToolId>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rustup"));
        assert!(msg.contains("bmad-method"));
    }

    #[test]
    fn test_mirrors() {
        assert!(ToolId::UvMirror.is_mirror());
        assert!(!ToolId::Uv.is_mirror());
    }
}
