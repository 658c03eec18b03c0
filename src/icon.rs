//! Icon rasterization.
//!
//! Runs only when the resolver found an icon source. Tries an ordered list
//! of external converters; the first one that is installed and succeeds
//! wins. Every failure path (no icon, no converter installed, converter
//! error) degrades to [`IconOutcome::Fallback`]; this stage never aborts
//! the pipeline.

use anyhow::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PackageSpec;
use crate::staging::{StagingTree, ICON_THEME_DIR};

/// Raster resolution for the theme path (`256x256`).
pub const ICON_SIZE: u32 = 256;

/// Result of the icon stage, consumed by the metadata generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconOutcome {
    /// One raster file was staged at the theme path; the desktop entry
    /// references it by package name. `tool` names the converter used.
    Converted { file: PathBuf, tool: &'static str },
    /// No icon staged; the desktop entry uses the fallback identifier.
    Fallback,
}

/// An external rasterizer candidate.
pub struct Converter {
    pub tool: &'static str,
    /// Converters that only understand vector sources are skipped for
    /// bitmap inputs.
    pub svg_only: bool,
    pub args: fn(source: &Path, dest: &Path) -> Vec<OsString>,
}

fn rsvg_args(source: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        "-w".into(),
        ICON_SIZE.to_string().into(),
        "-h".into(),
        ICON_SIZE.to_string().into(),
        "-o".into(),
        dest.into(),
        source.into(),
    ]
}

fn inkscape_args(source: &Path, dest: &Path) -> Vec<OsString> {
    let mut export = OsString::from("--export-filename=");
    export.push(dest);
    vec![
        "-w".into(),
        ICON_SIZE.to_string().into(),
        "-h".into(),
        ICON_SIZE.to_string().into(),
        export,
        source.into(),
    ]
}

fn imagemagick_args(source: &Path, dest: &Path) -> Vec<OsString> {
    vec![
        source.into(),
        "-background".into(),
        "none".into(),
        "-resize".into(),
        format!("{}x{}", ICON_SIZE, ICON_SIZE).into(),
        dest.into(),
    ]
}

/// Candidate converters, in preference order.
pub const DEFAULT_CONVERTERS: &[Converter] = &[
    Converter {
        tool: "rsvg-convert",
        svg_only: true,
        args: rsvg_args,
    },
    Converter {
        tool: "inkscape",
        svg_only: true,
        args: inkscape_args,
    },
    Converter {
        tool: "convert",
        svg_only: false,
        args: imagemagick_args,
    },
];

/// Rasterize the icon into the theme path, if possible.
///
/// On success the staged file is named after the package, not the source.
pub fn process_icon(
    tree: &mut StagingTree,
    spec: &PackageSpec,
    source: Option<&Path>,
) -> Result<IconOutcome> {
    process_icon_with(tree, spec, source, DEFAULT_CONVERTERS)
}

/// Same as [`process_icon`] with an explicit candidate list (tests inject
/// their own converters to control availability).
pub fn process_icon_with(
    tree: &mut StagingTree,
    spec: &PackageSpec,
    source: Option<&Path>,
    converters: &[Converter],
) -> Result<IconOutcome> {
    let Some(source) = source else {
        return Ok(IconOutcome::Fallback);
    };

    let is_svg = source
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let dest_rel = Path::new(ICON_THEME_DIR).join(format!("{}.png", spec.name));
    let dest_abs = tree.abs(&dest_rel);

    for converter in converters {
        if converter.svg_only && !is_svg {
            continue;
        }
        if which::which(converter.tool).is_err() {
            continue;
        }
        if run_converter(converter, source, &dest_abs) {
            tree.record(Some(source.to_path_buf()), &dest_rel, 0o644)?;
            return Ok(IconOutcome::Converted {
                file: dest_rel,
                tool: converter.tool,
            });
        }
        // A half-written raster must not leak into the package.
        let _ = fs::remove_file(&dest_abs);
    }

    Ok(IconOutcome::Fallback)
}

fn run_converter(converter: &Converter, source: &Path, dest: &Path) -> bool {
    let status = Command::new(converter.tool)
        .args((converter.args)(source, dest))
        .output();
    match status {
        Ok(output) => output.status.success() && dest.is_file(),
        Err(_) => false,
    }
}
