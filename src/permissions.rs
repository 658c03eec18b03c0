//! Deterministic file-mode policy for the finished staging tree.
//!
//! Runs after every writer and before the archiver. Directories get 0755;
//! regular files get 0644 unless they were recorded executable (the two
//! lifecycle hooks, the launcher wrapper, and an unwrapped binary
//! entrypoint). Host umask or source-file modes never leak into the
//! package.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

use crate::staging::StagingTree;

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Apply the mode policy across the whole tree.
pub fn normalize(tree: &StagingTree) -> Result<()> {
    for entry in WalkDir::new(tree.root()) {
        let entry = entry
            .with_context(|| format!("walking staging tree '{}'", tree.root().display()))?;
        let path = entry.path();
        let mode = if entry.file_type().is_dir() {
            DIR_MODE
        } else {
            let rel = path
                .strip_prefix(tree.root())
                .with_context(|| format!("relativizing '{}'", path.display()))?;
            match tree.recorded_mode(rel) {
                Some(mode) if mode & 0o111 != 0 => mode,
                _ => FILE_MODE,
            }
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("normalizing permissions on '{}'", path.display()))?;
    }
    Ok(())
}
