//! Pipeline orchestration.
//!
//! Stages run strictly in order; each consumes the filesystem state the
//! previous one left behind. A failure anywhere aborts the run. The staging
//! tree is deleted on every exit path (success, failure, panic unwind) so an
//! interrupted run is always safe to re-run from scratch.
//!
//! Concurrent runs against the same staging path are serialized with an
//! exclusive file lock beside the staging root. The lock file is never
//! unlinked: unlinking a still-locked file would let a second process create
//! a fresh file at the same path and take a separate exclusive lock.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::archive;
use crate::artifacts;
use crate::config::BuildConfig;
use crate::hooks;
use crate::icon::{self, IconOutcome};
use crate::metadata;
use crate::permissions;
use crate::preflight;
use crate::report::{self, BuildReport};
use crate::staging::{self, StagingTree};

/// What a successful run produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub report: BuildReport,
}

/// Run the full pipeline: resolve, stage, rasterize, render, normalize,
/// archive, report.
pub fn run(config: &BuildConfig, output_dir: &Path) -> Result<BuildOutcome> {
    let spec = &config.spec;
    println!(
        "[deb-builder] packaging {} {} ({})",
        spec.name, spec.version, spec.architecture
    );

    // Both prerequisite checks happen before any filesystem mutation.
    let resolved = artifacts::resolve(config)?;
    preflight::check_host_tools()?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;
    let staging_root = output_dir.join(format!("{}-staging", spec.name));

    let _lock = acquire_run_lock(&staging_root)?;
    let _cleanup = StagingCleanup {
        root: staging_root.clone(),
    };

    let mut tree = StagingTree::create(&staging_root)?;
    println!("  staging tree: {}", tree.root().display());

    let layout = staging::build_tree(&mut tree, spec, &resolved)
        .context("building package staging tree")?;

    let icon_outcome = icon::process_icon(&mut tree, spec, resolved.icon.as_deref())
        .context("processing icon")?;
    match &icon_outcome {
        IconOutcome::Converted { file, tool } => {
            println!("  icon: rasterized via {} -> {}", tool, file.display());
        }
        IconOutcome::Fallback => {
            println!("  icon: using fallback '{}'", metadata::FALLBACK_ICON);
        }
    }

    let template = match &resolved.desktop_template {
        Some(path) => Some(fs::read_to_string(path).with_context(|| {
            format!("reading desktop-entry template '{}'", path.display())
        })?),
        None => None,
    };
    let summary = metadata::write_metadata(
        &mut tree,
        spec,
        &layout,
        &icon_outcome,
        template.as_deref(),
    )
    .context("rendering package metadata")?;
    println!("  installed size: {} KiB", summary.installed_size_kib);

    hooks::write_hooks(&mut tree, spec).context("rendering lifecycle hooks")?;
    permissions::normalize(&tree).context("normalizing permissions")?;

    let artifact =
        archive::build_archive(tree.root(), spec, output_dir).context("building archive")?;
    println!("  archive: {}", artifact.display());

    let report = report::write_report(&artifact, spec, &summary, &icon_outcome)
        .context("writing build report")?;

    Ok(BuildOutcome { artifact, report })
}

/// Deletes the staging tree when dropped, on every exit path.
struct StagingCleanup {
    root: PathBuf,
}

impl Drop for StagingCleanup {
    fn drop(&mut self) {
        if self.root.exists() {
            if let Err(err) = fs::remove_dir_all(&self.root) {
                eprintln!(
                    "warning: failed to remove staging tree '{}': {}",
                    self.root.display(),
                    err
                );
            }
        }
    }
}

/// Exclusive run lock for a staging path.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Acquire the lock beside `staging_root`, failing fast if another run
/// holds it.
pub fn acquire_run_lock(staging_root: &Path) -> Result<RunLock> {
    let mut name = staging_root
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "staging".into());
    name.push(".lock");
    let lock_path = staging_root.with_file_name(name);

    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("creating run lock file '{}'", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        drop(lock_file);
        anyhow::bail!(
            "staging path is locked by another run: {}",
            lock_path.display()
        );
    }

    Ok(RunLock {
        _file: lock_file,
        path: lock_path,
    })
}
