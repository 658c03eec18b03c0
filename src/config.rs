//! Build configuration: the immutable [`PackageSpec`] plus artifact paths.
//!
//! The config is a TOML file loaded once at pipeline start. Every diagnostic
//! names the config path so a bad field is traceable without guessing.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A runtime dependency constraint: a package name plus an optional version
/// comparison, e.g. `python3 (>= 3.10)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<String>,
}

impl Dependency {
    /// Parse `"name"` or `"name (OP version)"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("empty dependency entry");
        }
        match raw.split_once('(') {
            None => Ok(Self {
                name: raw.to_string(),
                constraint: None,
            }),
            Some((name, rest)) => {
                let name = name.trim();
                let constraint = rest.trim_end_matches(')').trim();
                if name.is_empty() || constraint.is_empty() || !rest.ends_with(')') {
                    bail!("malformed dependency entry '{}'", raw);
                }
                Ok(Self {
                    name: name.to_string(),
                    constraint: Some(constraint.to_string()),
                })
            }
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{} ({})", self.name, constraint),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Desktop-integration fields rendered into the `.desktop` entry.
#[derive(Debug, Clone)]
pub struct DesktopSpec {
    pub display_name: String,
    pub generic_name: String,
    pub comment: String,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
}

/// Immutable package descriptor. Constructed once at pipeline start and
/// read-only thereafter; every downstream stage derives its paths and
/// identifiers from this single value.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    pub description: String,
    pub long_description: Option<String>,
    pub depends: Vec<Dependency>,
    pub section: String,
    pub priority: String,
    pub homepage: Option<String>,
    /// Absolute install root for the application payload.
    pub install_root: PathBuf,
    /// Whether a `usr/bin` launcher wrapper is generated around the
    /// entrypoint. Defaults to true for script entrypoints.
    pub wrap_entrypoint: bool,
    /// Runtime packages only available from the Python package index,
    /// installed best-effort by the post-install hook.
    pub pip_packages: Vec<String>,
    pub desktop: DesktopSpec,
}

impl PackageSpec {
    /// `<name>_<version>_<arch>.deb`
    pub fn artifact_file_name(&self) -> String {
        format!("{}_{}_{}.deb", self.name, self.version, self.architecture)
    }

    /// Install root as a path relative to the staging root.
    pub fn install_root_rel(&self) -> PathBuf {
        self.install_root
            .strip_prefix("/")
            .unwrap_or(&self.install_root)
            .to_path_buf()
    }
}

/// Fully loaded build configuration: the spec plus resolved input paths.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub spec: PackageSpec,
    pub entrypoint: PathBuf,
    pub icon: Option<PathBuf>,
    pub desktop_template: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    package: PackageToml,
    artifacts: ArtifactsToml,
    install: Option<InstallToml>,
    desktop: Option<DesktopToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageToml {
    name: String,
    version: String,
    architecture: Option<String>,
    maintainer: String,
    description: String,
    long_description: Option<String>,
    depends: Option<Vec<String>>,
    section: Option<String>,
    priority: Option<String>,
    homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArtifactsToml {
    entrypoint: PathBuf,
    icon: Option<PathBuf>,
    desktop_template: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallToml {
    root: Option<PathBuf>,
    wrap_entrypoint: Option<bool>,
    pip_packages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DesktopToml {
    display_name: Option<String>,
    generic_name: Option<String>,
    comment: Option<String>,
    categories: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
}

/// Load and validate a build configuration.
///
/// Relative artifact paths are resolved against the config file's directory.
pub fn load_build_config(config_path: &Path) -> Result<BuildConfig> {
    let bytes = fs::read_to_string(config_path)
        .with_context(|| format!("reading build config '{}'", config_path.display()))?;
    let parsed: ConfigToml = toml::from_str(&bytes)
        .with_context(|| format!("parsing build config '{}'", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or(Path::new("."));

    let package = parsed.package;
    validate_package_name(&package.name, config_path)?;
    validate_version(&package.version, config_path)?;
    if !package.maintainer.contains('@') {
        bail!(
            "invalid build config '{}': maintainer must include an email address",
            config_path.display()
        );
    }

    let mut depends = Vec::new();
    for raw in package.depends.unwrap_or_default() {
        let dep = Dependency::parse(&raw)
            .with_context(|| format!("invalid dependency in '{}'", config_path.display()))?;
        depends.push(dep);
    }

    let install = parsed.install.unwrap_or(InstallToml {
        root: None,
        wrap_entrypoint: None,
        pip_packages: None,
    });
    let install_root = match install.root {
        Some(root) => {
            if !root.is_absolute() {
                bail!(
                    "invalid build config '{}': install.root must be absolute, got '{}'",
                    config_path.display(),
                    root.display()
                );
            }
            root
        }
        None => PathBuf::from("/opt").join(&package.name),
    };

    let entrypoint = resolve_input_path(base_dir, &parsed.artifacts.entrypoint);
    let wrap_entrypoint = install
        .wrap_entrypoint
        .unwrap_or_else(|| entrypoint_is_script(&entrypoint));

    let desktop_toml = parsed.desktop.unwrap_or(DesktopToml {
        display_name: None,
        generic_name: None,
        comment: None,
        categories: None,
        keywords: None,
    });
    let desktop = DesktopSpec {
        display_name: desktop_toml
            .display_name
            .unwrap_or_else(|| package.name.clone()),
        generic_name: desktop_toml
            .generic_name
            .unwrap_or_else(|| package.description.clone()),
        comment: desktop_toml
            .comment
            .unwrap_or_else(|| package.description.clone()),
        categories: desktop_toml
            .categories
            .unwrap_or_else(|| vec!["Utility".to_string()]),
        keywords: desktop_toml.keywords.unwrap_or_default(),
    };

    let spec = PackageSpec {
        name: package.name,
        version: package.version,
        architecture: package.architecture.unwrap_or_else(|| "amd64".to_string()),
        maintainer: package.maintainer,
        description: package.description,
        long_description: package.long_description,
        depends,
        section: package.section.unwrap_or_else(|| "utils".to_string()),
        priority: package.priority.unwrap_or_else(|| "optional".to_string()),
        homepage: package.homepage,
        install_root,
        wrap_entrypoint,
        pip_packages: install.pip_packages.unwrap_or_default(),
        desktop,
    };

    Ok(BuildConfig {
        spec,
        entrypoint,
        icon: parsed
            .artifacts
            .icon
            .map(|path| resolve_input_path(base_dir, &path)),
        desktop_template: parsed
            .artifacts
            .desktop_template
            .map(|path| resolve_input_path(base_dir, &path)),
    })
}

fn resolve_input_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn entrypoint_is_script(entrypoint: &Path) -> bool {
    matches!(
        entrypoint.extension().and_then(|ext| ext.to_str()),
        Some("py") | Some("sh")
    )
}

fn validate_package_name(name: &str, config_path: &Path) -> Result<()> {
    let valid = name.len() >= 2
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
    if !valid {
        bail!(
            "invalid build config '{}': package name '{}' is not a valid Debian package name",
            config_path.display(),
            name
        );
    }
    Ok(())
}

fn validate_version(version: &str, config_path: &Path) -> Result<()> {
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 3 && parts.iter().all(|part| part.parse::<u64>().is_ok());
    if !valid {
        bail!(
            "invalid build config '{}': version '{}' must be three numeric parts (e.g. 1.0.0)",
            config_path.display(),
            version
        );
    }
    Ok(())
}
