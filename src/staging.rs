//! Staging tree construction.
//!
//! The staging root mirrors the installed filesystem layout and is created
//! fresh for every run: a stale tree from a previous (possibly interrupted)
//! run is deleted first, which is what makes consecutive runs with identical
//! inputs byte-identical.
//!
//! Every file placed in the tree is recorded as a [`StagedFile`]. That record
//! is the single source of truth for the metadata generator (installed size,
//! Exec/Icon references) and the permission normalizer (which files keep
//! execute bits), so the rendered artifacts can never drift from what was
//! actually staged.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::artifacts::ResolvedArtifacts;
use crate::config::PackageSpec;

/// Control-metadata directory consumed by dpkg-deb.
pub const CONTROL_DIR: &str = "DEBIAN";
/// Launcher directory on the standard executable search path.
pub const BIN_DIR: &str = "usr/bin";
/// Desktop-entry directory.
pub const APPLICATIONS_DIR: &str = "usr/share/applications";
/// Icon-theme directory for the raster icon (keyed by resolution).
pub const ICON_THEME_DIR: &str = "usr/share/icons/hicolor/256x256/apps";

/// One staged file: where it came from, where it lives relative to the
/// staging root, and the mode it must carry in the final package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Source path on the build host; `None` for generated content.
    pub source: Option<PathBuf>,
    /// Destination relative to the staging root.
    pub dest: PathBuf,
    pub mode: u32,
}

/// The staging root directory plus the record of everything placed in it.
#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
    files: Vec<StagedFile>,
}

impl StagingTree {
    /// Create a fresh staging tree at `root`, deleting any previous one.
    pub fn create(root: &Path) -> Result<Self> {
        if root.exists() {
            fs::remove_dir_all(root).with_context(|| {
                format!(
                    "removing stale staging tree before recreation '{}'",
                    root.display()
                )
            })?;
        }
        fs::create_dir_all(root)
            .with_context(|| format!("creating staging tree '{}'", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            files: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Absolute path of a staging-relative destination.
    pub fn abs(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn ensure_dir(&self, rel: impl AsRef<Path>) -> Result<()> {
        let path = self.abs(rel);
        fs::create_dir_all(&path)
            .with_context(|| format!("creating staging directory '{}'", path.display()))
    }

    /// Copy a host file into the tree and record it.
    pub fn copy_file(&mut self, source: &Path, dest: impl AsRef<Path>, mode: u32) -> Result<()> {
        let dest = dest.as_ref().to_path_buf();
        let abs = self.abs(&dest);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating staging directory '{}'", parent.display()))?;
        }
        fs::copy(source, &abs).with_context(|| {
            format!(
                "copying '{}' into staging tree at '{}'",
                source.display(),
                abs.display()
            )
        })?;
        set_mode(&abs, mode)?;
        self.files.push(StagedFile {
            source: Some(source.to_path_buf()),
            dest,
            mode,
        });
        Ok(())
    }

    /// Write generated content into the tree and record it.
    pub fn write_file(&mut self, dest: impl AsRef<Path>, content: &str, mode: u32) -> Result<()> {
        let dest = dest.as_ref().to_path_buf();
        let abs = self.abs(&dest);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating staging directory '{}'", parent.display()))?;
        }
        fs::write(&abs, content)
            .with_context(|| format!("writing staged file '{}'", abs.display()))?;
        set_mode(&abs, mode)?;
        self.files.push(StagedFile {
            source: None,
            dest,
            mode,
        });
        Ok(())
    }

    /// Record a file that an external tool already wrote into the tree.
    pub fn record(&mut self, source: Option<PathBuf>, dest: impl AsRef<Path>, mode: u32) -> Result<()> {
        let dest = dest.as_ref().to_path_buf();
        let abs = self.abs(&dest);
        set_mode(&abs, mode)?;
        self.files.push(StagedFile { source, dest, mode });
        Ok(())
    }

    /// The recorded mode for a staging-relative path, if any.
    pub fn recorded_mode(&self, rel: &Path) -> Option<u32> {
        self.files
            .iter()
            .find(|file| file.dest == rel)
            .map(|file| file.mode)
    }
}

fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions on '{}'", path.display()))
}

/// Paths later stages depend on, all derived from one [`PackageSpec`].
#[derive(Debug, Clone)]
pub struct StagedLayout {
    /// Staged entrypoint, relative to the staging root.
    pub entrypoint: PathBuf,
    /// Launcher wrapper, relative to the staging root; `None` when the
    /// entrypoint is installed as a directly executable command.
    pub launcher: Option<PathBuf>,
    /// Command the desktop entry launches.
    pub exec_command: String,
}

/// Build the canonical package subtree and place the application payload.
pub fn build_tree(
    tree: &mut StagingTree,
    spec: &PackageSpec,
    artifacts: &ResolvedArtifacts,
) -> Result<StagedLayout> {
    tree.ensure_dir(CONTROL_DIR)?;
    tree.ensure_dir(spec.install_root_rel())?;
    tree.ensure_dir(BIN_DIR)?;
    tree.ensure_dir(APPLICATIONS_DIR)?;
    tree.ensure_dir(ICON_THEME_DIR)?;

    let entry_name = artifacts
        .entrypoint
        .file_name()
        .with_context(|| {
            format!(
                "entrypoint '{}' has no file name",
                artifacts.entrypoint.display()
            )
        })?
        .to_owned();
    let entrypoint_rel = spec.install_root_rel().join(&entry_name);
    tree.copy_file(&artifacts.entrypoint, &entrypoint_rel, 0o755)?;

    let installed_entrypoint = spec.install_root.join(&entry_name);
    let (launcher, exec_command) = if spec.wrap_entrypoint {
        let launcher_rel = Path::new(BIN_DIR).join(&spec.name);
        let script = render_launcher(&installed_entrypoint);
        tree.write_file(&launcher_rel, &script, 0o755)?;
        let exec = format!("/{}", launcher_rel.display());
        (Some(launcher_rel), exec)
    } else {
        (None, installed_entrypoint.display().to_string())
    };

    Ok(StagedLayout {
        entrypoint: entrypoint_rel,
        launcher,
        exec_command,
    })
}

/// Minimal wrapper: invoke the installed entrypoint, forwarding arguments.
fn render_launcher(installed_entrypoint: &Path) -> String {
    format!(
        "#!/bin/sh\nexec \"{}\" \"$@\"\n",
        installed_entrypoint.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn demo_spec() -> PackageSpec {
        use crate::config::DesktopSpec;
        PackageSpec {
            name: "demo".to_string(),
            version: "1.0.0".to_string(),
            architecture: "amd64".to_string(),
            maintainer: "Demo Team <demo@example.org>".to_string(),
            description: "Demo application".to_string(),
            long_description: None,
            depends: Vec::new(),
            section: "utils".to_string(),
            priority: "optional".to_string(),
            homepage: None,
            install_root: PathBuf::from("/opt/demo"),
            wrap_entrypoint: true,
            pip_packages: Vec::new(),
            desktop: DesktopSpec {
                display_name: "Demo".to_string(),
                generic_name: "Demo".to_string(),
                comment: "Demo application".to_string(),
                categories: vec!["Utility".to_string()],
                keywords: Vec::new(),
            },
        }
    }

    fn demo_artifacts(dir: &TempDir) -> ResolvedArtifacts {
        let entrypoint = dir.path().join("demo.py");
        fs::write(&entrypoint, "#!/usr/bin/env python3\nprint('hi')\n").unwrap();
        ResolvedArtifacts {
            entrypoint,
            icon: None,
            desktop_template: None,
        }
    }

    #[test]
    fn test_build_tree_creates_canonical_layout() {
        let dir = TempDir::new().unwrap();
        let mut tree = StagingTree::create(&dir.path().join("staging")).unwrap();
        let layout = build_tree(&mut tree, &demo_spec(), &demo_artifacts(&dir)).unwrap();

        assert!(tree.abs(CONTROL_DIR).is_dir());
        assert!(tree.abs("opt/demo/demo.py").is_file());
        assert!(tree.abs("usr/bin/demo").is_file());
        assert!(tree.abs(APPLICATIONS_DIR).is_dir());
        assert!(tree.abs(ICON_THEME_DIR).is_dir());
        assert_eq!(layout.exec_command, "/usr/bin/demo");
        assert_eq!(layout.launcher, Some(PathBuf::from("usr/bin/demo")));
    }

    #[test]
    fn test_launcher_forwards_arguments() {
        let dir = TempDir::new().unwrap();
        let mut tree = StagingTree::create(&dir.path().join("staging")).unwrap();
        build_tree(&mut tree, &demo_spec(), &demo_artifacts(&dir)).unwrap();

        let launcher = fs::read_to_string(tree.abs("usr/bin/demo")).unwrap();
        assert!(launcher.starts_with("#!/bin/sh\n"));
        assert!(launcher.contains("exec \"/opt/demo/demo.py\" \"$@\""));

        let mode = fs::metadata(tree.abs("usr/bin/demo"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_unwrapped_binary_has_no_launcher() {
        let dir = TempDir::new().unwrap();
        let mut spec = demo_spec();
        spec.wrap_entrypoint = false;
        let mut tree = StagingTree::create(&dir.path().join("staging")).unwrap();
        let layout = build_tree(&mut tree, &spec, &demo_artifacts(&dir)).unwrap();

        assert!(layout.launcher.is_none());
        assert!(!tree.abs("usr/bin/demo").exists());
        assert_eq!(layout.exec_command, "/opt/demo/demo.py");
        // the payload itself carries the execute bit
        assert_eq!(tree.recorded_mode(Path::new("opt/demo/demo.py")), Some(0o755));
    }

    #[test]
    fn test_stale_tree_is_deleted_first() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("staging");
        fs::create_dir_all(root.join("leftover")).unwrap();
        fs::write(root.join("leftover/junk"), "stale").unwrap();

        let tree = StagingTree::create(&root).unwrap();
        assert!(!tree.abs("leftover").exists());
    }

    #[test]
    fn test_two_runs_are_byte_identical() {
        let dir = TempDir::new().unwrap();
        let spec = demo_spec();
        let artifacts = demo_artifacts(&dir);
        let root = dir.path().join("staging");

        let mut first = StagingTree::create(&root).unwrap();
        build_tree(&mut first, &spec, &artifacts).unwrap();
        let launcher_a = fs::read(first.abs("usr/bin/demo")).unwrap();
        let entry_a = fs::read(first.abs("opt/demo/demo.py")).unwrap();

        let mut second = StagingTree::create(&root).unwrap();
        build_tree(&mut second, &spec, &artifacts).unwrap();
        assert_eq!(fs::read(second.abs("usr/bin/demo")).unwrap(), launcher_a);
        assert_eq!(fs::read(second.abs("opt/demo/demo.py")).unwrap(), entry_a);
        assert_eq!(first.files(), second.files());
    }
}
