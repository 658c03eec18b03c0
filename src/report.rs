//! Build report written next to the finished artifact.
//!
//! The report is the user-visible record of the run: identity, installed
//! size, whether the optional icon path or the fallback path was taken,
//! and the artifact's sha256 so consumers can verify what they shipped.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::PackageSpec;
use crate::icon::IconOutcome;
use crate::metadata::MetadataSummary;

/// Outcome of the icon stage as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconPath {
    /// The supplied icon was rasterized and staged.
    Converted,
    /// No icon staged; the desktop entry carries the fallback identifier.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub package: String,
    pub version: String,
    pub architecture: String,
    pub installed_size_kib: u64,
    pub icon: IconPath,
    /// The exact Icon= identifier written to the desktop entry.
    pub icon_id: String,
    pub artifact: PathBuf,
    pub artifact_sha256: String,
    pub artifact_size_bytes: u64,
    pub finished_at_unix: u64,
}

/// Write `<artifact stem>.report.json` beside the artifact.
pub fn write_report(
    artifact: &Path,
    spec: &PackageSpec,
    summary: &MetadataSummary,
    icon_outcome: &IconOutcome,
) -> Result<BuildReport> {
    let sha256 = sha256_file(artifact)?;
    let size = fs::metadata(artifact)
        .with_context(|| format!("reading artifact metadata '{}'", artifact.display()))?
        .len();

    let report = BuildReport {
        package: spec.name.clone(),
        version: spec.version.clone(),
        architecture: spec.architecture.clone(),
        installed_size_kib: summary.installed_size_kib,
        icon: match icon_outcome {
            IconOutcome::Converted { .. } => IconPath::Converted,
            IconOutcome::Fallback => IconPath::Fallback,
        },
        icon_id: summary.icon_id.clone(),
        artifact: artifact.to_path_buf(),
        artifact_sha256: sha256,
        artifact_size_bytes: size,
        finished_at_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };

    let path = report_path(artifact);
    let json = serde_json::to_string_pretty(&report).context("serializing build report")?;
    fs::write(&path, json)
        .with_context(|| format!("writing build report '{}'", path.display()))?;
    Ok(report)
}

/// Report path for a given artifact: `demo_1.0.0_amd64.deb` ->
/// `demo_1.0.0_amd64.report.json`.
pub fn report_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("report.json")
}

fn sha256_file(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("opening '{}' for hashing", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("hashing '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
