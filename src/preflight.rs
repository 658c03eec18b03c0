//! Preflight checks for host tool validation.
//!
//! Validates that mandatory external tools exist before the pipeline
//! mutates anything. This prevents cryptic mid-build failures and a
//! half-written staging tree.
//!
//! Icon converters are deliberately not listed here: their absence is the
//! documented icon fallback, probed per-candidate in [`crate::icon`].

use anyhow::{bail, Result};

use crate::error::BuildError;

/// Mandatory host tools as (command, providing package).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[("dpkg-deb", "dpkg")];

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available; reports every missing one.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(tool, package)| format!("  {} (install: {})", tool, package))
            .collect::<Vec<_>>()
            .join("\n");
        bail!(BuildError::MissingRequiredTool(msg));
    }

    Ok(())
}

/// Check all tools in [`REQUIRED_TOOLS`].
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}
