//! Pipeline for assembling a desktop application into an installable
//! `.deb` package.
//!
//! The hard part is not the archive format (that is `dpkg-deb`'s job) but
//! keeping the generated artifacts consistent: the staged filesystem layout,
//! the control metadata derived from it, the lifecycle hooks that reference
//! its paths, and the desktop entry that references its icon. One in-memory
//! model ([`config::PackageSpec`] plus the [`staging::StagedFile`] record)
//! is the single source of truth for all of them.
//!
//! # Architecture
//!
//! Stages run strictly downstream; each consumes the filesystem state the
//! previous one left behind:
//!
//! ```text
//! artifacts    resolve inputs (entrypoint required, icon/template optional)
//!     │
//! staging      fresh staging tree, canonical layout, payload + launcher
//!     │
//! icon         optional rasterization, degrades to a fallback identifier
//!     │
//! metadata     installed size, DEBIAN/control, .desktop entry
//!     │
//! hooks        postinst / postrm rendered from the same PackageSpec
//!     │
//! permissions  deterministic mode policy over the finished tree
//!     │
//! archive      dpkg-deb --build --root-owner-group
//! ```
//!
//! The staging tree is created fresh per run and deleted on every exit path,
//! so interrupted runs are always safe to re-run, and two consecutive runs
//! with identical inputs produce byte-identical staged trees.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let config = deb_builder::load_build_config(Path::new("package.toml"))?;
//! let outcome = deb_builder::run(&config, Path::new("output"))?;
//! println!("built {}", outcome.artifact.display());
//! ```

pub mod archive;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod hooks;
pub mod icon;
pub mod metadata;
pub mod permissions;
pub mod pipeline;
pub mod preflight;
pub mod report;
pub mod staging;

pub use config::{load_build_config, BuildConfig, PackageSpec};
pub use error::BuildError;
pub use pipeline::{run, BuildOutcome};
