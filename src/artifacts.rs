//! Input artifact resolution.
//!
//! The entrypoint is required and its absence is fatal before anything is
//! written to disk. The icon and the desktop-entry template are optional:
//! absence propagates as `None` so later stages degrade instead of failing.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::error::BuildError;

/// The verified input set consumed by the tree builder.
#[derive(Debug, Clone)]
pub struct ResolvedArtifacts {
    pub entrypoint: PathBuf,
    pub icon: Option<PathBuf>,
    pub desktop_template: Option<PathBuf>,
}

/// Verify the required entrypoint and probe the optional inputs.
pub fn resolve(config: &BuildConfig) -> Result<ResolvedArtifacts> {
    require_readable(&config.entrypoint)?;

    Ok(ResolvedArtifacts {
        entrypoint: config.entrypoint.clone(),
        icon: probe_optional("icon", config.icon.as_deref()),
        desktop_template: probe_optional("desktop template", config.desktop_template.as_deref()),
    })
}

fn require_readable(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!(BuildError::MissingRequiredArtifact(path.to_path_buf()));
    }
    // Existence is not readability (mode 000 files exist but can't be staged).
    File::open(path)
        .map(|_| ())
        .with_context(|| format!("opening required artifact '{}'", path.display()))
}

fn probe_optional(label: &str, path: Option<&Path>) -> Option<PathBuf> {
    let path = path?;
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        println!(
            "  optional {} '{}' not found; continuing without it",
            label,
            path.display()
        );
        None
    }
}
