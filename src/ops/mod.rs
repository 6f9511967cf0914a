//! High-level operations.
//!
//! This module contains the implementation of kickstart commands.

pub mod orchestrator;
pub mod shell_setup;
pub mod status;
pub mod summary;

pub use orchestrator::{Action, InstallerFactory, Orchestrator, RunEvent, RunOptions, RunResult};
pub use shell_setup::{setup_shell, ShellSetup};
pub use status::{detect_all, detect_tool, format_status_table};
pub use summary::{exit_code_for, format_summary};
