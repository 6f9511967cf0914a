//! Core data structures for kickstart.
//!
//! This module contains the foundational types used throughout kickstart:
//! - Tool identities, dependencies and the fixed install order
//! - The detected platform
//! - Per-tool reports and run summaries

pub mod platform;
pub mod report;
pub mod tool;

pub use platform::{Arch, Os, PlatformInfo, ShellKind};
pub use report::{InstallOutcome, InstallReport, Summary, ToolStatus};
pub use tool::{check_install_order, ToolId, INSTALL_ORDER};
