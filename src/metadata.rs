//! Derived package metadata: installed size, `DEBIAN/control`, and the
//! desktop-integration entry.
//!
//! Both records are rendered from the same in-memory [`PackageSpec`] and
//! [`StagedLayout`], so paths and icon identifiers cannot drift between
//! the staged tree and the text artifacts describing it.

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::PackageSpec;
use crate::icon::IconOutcome;
use crate::staging::{StagedLayout, StagingTree, APPLICATIONS_DIR, CONTROL_DIR};

/// Icon identifier used when no raster icon was staged. A well-known theme
/// id, so the desktop environment always has something to show.
pub const FALLBACK_ICON: &str = "media-record";

/// What the metadata stage produced, carried into the final report.
#[derive(Debug, Clone)]
pub struct MetadataSummary {
    pub installed_size_kib: u64,
    /// The Icon= value written to the desktop entry.
    pub icon_id: String,
}

/// Sum of file sizes under `root`, rounded up to whole KiB.
///
/// Matches dpkg's Installed-Size convention; computed before the control
/// files are written, so only the payload counts.
pub fn installed_size_kib(root: &Path) -> Result<u64> {
    let mut bytes: u64 = 0;
    for entry in WalkDir::new(root) {
        let entry = entry
            .with_context(|| format!("walking staging tree '{}'", root.display()))?;
        if entry.file_type().is_file() {
            let meta = entry.metadata().with_context(|| {
                format!("reading metadata for '{}'", entry.path().display())
            })?;
            bytes += meta.len();
        }
    }
    Ok(bytes.div_ceil(1024))
}

/// Render the `DEBIAN/control` record.
pub fn render_control(spec: &PackageSpec, installed_size_kib: u64) -> String {
    let mut out = String::new();
    out.push_str(&format!("Package: {}\n", spec.name));
    out.push_str(&format!("Version: {}\n", spec.version));
    out.push_str(&format!("Architecture: {}\n", spec.architecture));
    out.push_str(&format!("Maintainer: {}\n", spec.maintainer));
    out.push_str(&format!("Installed-Size: {}\n", installed_size_kib));
    if !spec.depends.is_empty() {
        let depends = spec
            .depends
            .iter()
            .map(|dep| dep.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("Depends: {}\n", depends));
    }
    out.push_str(&format!("Section: {}\n", spec.section));
    out.push_str(&format!("Priority: {}\n", spec.priority));
    if let Some(homepage) = &spec.homepage {
        out.push_str(&format!("Homepage: {}\n", homepage));
    }
    out.push_str(&format!("Description: {}\n", spec.description));
    if let Some(long) = &spec.long_description {
        for line in long.trim_end().lines() {
            if line.trim().is_empty() {
                out.push_str(" .\n");
            } else {
                out.push_str(&format!(" {}\n", line));
            }
        }
    }
    out
}

/// The Icon= value for a given icon outcome.
pub fn icon_id(spec: &PackageSpec, outcome: &IconOutcome) -> String {
    match outcome {
        IconOutcome::Converted { .. } => spec.name.clone(),
        IconOutcome::Fallback => FALLBACK_ICON.to_string(),
    }
}

/// Render the desktop entry inline.
pub fn render_desktop(spec: &PackageSpec, layout: &StagedLayout, outcome: &IconOutcome) -> String {
    let desktop = &spec.desktop;
    let mut out = String::new();
    out.push_str("[Desktop Entry]\n");
    out.push_str("Version=1.0\n");
    out.push_str("Type=Application\n");
    out.push_str(&format!("Name={}\n", desktop.display_name));
    out.push_str(&format!("GenericName={}\n", desktop.generic_name));
    out.push_str(&format!("Comment={}\n", desktop.comment));
    out.push_str(&format!("Exec={}\n", layout.exec_command));
    out.push_str(&format!("Icon={}\n", icon_id(spec, outcome)));
    out.push_str("Terminal=false\n");
    out.push_str(&format!("Categories={};\n", desktop.categories.join(";")));
    if !desktop.keywords.is_empty() {
        out.push_str(&format!("Keywords={};\n", desktop.keywords.join(";")));
    }
    out.push_str("StartupNotify=true\n");
    out
}

/// Render the desktop entry from a user-supplied template.
///
/// The template carries `@NAME@`, `@GENERIC_NAME@`, `@COMMENT@`, `@EXEC@`,
/// `@ICON@`, `@CATEGORIES@` and `@KEYWORDS@` tokens; everything else is
/// passed through verbatim.
pub fn render_desktop_template(
    template: &str,
    spec: &PackageSpec,
    layout: &StagedLayout,
    outcome: &IconOutcome,
) -> String {
    template
        .replace("@NAME@", &spec.desktop.display_name)
        .replace("@GENERIC_NAME@", &spec.desktop.generic_name)
        .replace("@COMMENT@", &spec.desktop.comment)
        .replace("@EXEC@", &layout.exec_command)
        .replace("@ICON@", &icon_id(spec, outcome))
        .replace("@CATEGORIES@", &spec.desktop.categories.join(";"))
        .replace("@KEYWORDS@", &spec.desktop.keywords.join(";"))
}

/// Compute the installed size, then write `DEBIAN/control` and the desktop
/// entry into the tree.
pub fn write_metadata(
    tree: &mut StagingTree,
    spec: &PackageSpec,
    layout: &StagedLayout,
    outcome: &IconOutcome,
    template: Option<&str>,
) -> Result<MetadataSummary> {
    // Size first: the control files themselves are not installed payload.
    let size = installed_size_kib(tree.root())?;

    let control = render_control(spec, size);
    tree.write_file(Path::new(CONTROL_DIR).join("control"), &control, 0o644)?;

    let desktop = match template {
        Some(template) => render_desktop_template(template, spec, layout, outcome),
        None => render_desktop(spec, layout, outcome),
    };
    let desktop_rel = Path::new(APPLICATIONS_DIR).join(format!("{}.desktop", spec.name));
    tree.write_file(&desktop_rel, &desktop, 0o644)?;

    Ok(MetadataSummary {
        installed_size_kib: size,
        icon_id: icon_id(spec, outcome),
    })
}
