//! Final archive creation via `dpkg-deb`.
//!
//! `--root-owner-group` makes every packaged file owned by root:root so
//! build-machine uids and gids never leak into the distributed artifact.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PackageSpec;
use crate::error::BuildError;

/// Build `<output_dir>/<name>_<version>_<arch>.deb` from the staging root.
///
/// An existing artifact of the same name is overwritten. Failure carries
/// the tool's full diagnostic output.
pub fn build_archive(
    staging_root: &Path,
    spec: &PackageSpec,
    output_dir: &Path,
) -> Result<PathBuf> {
    let artifact = output_dir.join(spec.artifact_file_name());

    let output = Command::new("dpkg-deb")
        .arg("--build")
        .arg("--root-owner-group")
        .arg(staging_root)
        .arg(&artifact)
        .output()
        .with_context(|| {
            format!(
                "running dpkg-deb on staging tree '{}'",
                staging_root.display()
            )
        })?;

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(BuildError::ArchiveBuildFailed {
            status: output.status.to_string(),
            output: format!("{}\n{}", stdout.trim(), stderr.trim())
                .trim()
                .to_string(),
        });
    }

    Ok(artifact)
}
