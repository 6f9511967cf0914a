//! Tool status detection for `kickstart status`.
//!
//! Detection reuses each installer's `verify`/`detect_version`/`location`, so
//! what `status` reports is exactly what `install` would skip.

use std::fmt::Write;

use crate::core::report::ToolStatus;
use crate::core::tool::{ToolId, INSTALL_ORDER};
use crate::installer::{create_installer, Installer, InstallerContext};
use crate::util::config::Config;

/// Detect a single tool through an installer.
pub fn detect_with(installer: &dyn Installer) -> ToolStatus {
    let tool = installer.tool();
    if !installer.verify() {
        tracing::debug!("{} not detected", tool);
        return ToolStatus::missing(tool);
    }

    ToolStatus::installed(tool, installer.detect_version(), installer.location())
}

/// Detect a single tool with the built-in installer.
pub fn detect_tool(tool: ToolId, ctx: InstallerContext) -> ToolStatus {
    detect_with(create_installer(tool, ctx).as_ref())
}

/// Detect every known tool, in install order.
///
/// Disabled tools are still probed; `enabled` only affects installation.
pub fn detect_all(base: &InstallerContext, config: &Config) -> Vec<ToolStatus> {
    INSTALL_ORDER
        .iter()
        .map(|&tool| detect_tool(tool, base.for_tool(tool, config)))
        .collect()
}

/// Render statuses as an aligned table.
pub fn format_status_table(statuses: &[ToolStatus]) -> String {
    let name_width = statuses
        .iter()
        .map(|s| s.name.as_str().len())
        .max()
        .unwrap_or(0)
        .max("TOOL".len());
    let version_width = statuses
        .iter()
        .filter_map(|s| s.version.as_deref().map(str::len))
        .max()
        .unwrap_or(0)
        .max("VERSION".len());

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<nw$}  {:<9}  {:<vw$}  PATH",
        "TOOL",
        "STATUS",
        "VERSION",
        nw = name_width,
        vw = version_width
    );

    for status in statuses {
        let mark = if status.installed { "installed" } else { "missing" };
        let version = status.version.as_deref().unwrap_or("-");
        let path = status
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            output,
            "{:<nw$}  {:<9}  {:<vw$}  {}",
            status.name.as_str(),
            mark,
            version,
            path,
            nw = name_width,
            vw = version_width
        );
    }

    let installed = statuses.iter().filter(|s| s.installed).count();
    let _ = write!(output, "\n{} of {} tools installed", installed, statuses.len());
    output
}
