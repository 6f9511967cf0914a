//! Kickstart - bootstrap a development environment in one command
//!
//! This crate provides the library behind the `kickstart` CLI: tool
//! identities and install order, layered configuration, per-tool installers,
//! and the sequential orchestrator that drives them.

pub mod core;
pub mod installer;
pub mod ops;
pub mod util;

/// Test utilities and mocks for kickstart unit tests.
///
/// This module is only available when running tests. It provides a scripted
/// command runner so installers can be exercised without touching the host.
#[cfg(test)]
pub mod test_support;

pub use core::{
    platform::PlatformInfo,
    report::{InstallOutcome, InstallReport, Summary, ToolStatus},
    tool::{ToolId, INSTALL_ORDER},
};

pub use installer::{create_installer, Installer, InstallerContext};
pub use ops::{Orchestrator, RunOptions, RunResult};
pub use util::context::GlobalContext;
