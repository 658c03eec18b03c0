//! Fatal error taxonomy for the packaging pipeline.
//!
//! Stages raise these through `anyhow` (`bail!(BuildError::...)`) so callers
//! keep contexted error chains but can still `downcast_ref::<BuildError>()`
//! to branch on the failure class.
//!
//! Optional-resource absence (missing icon, no usable converter) is
//! deliberately not an error: it propagates as data via
//! [`crate::icon::IconOutcome::Fallback`].

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline failures. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required input artifact (the application entrypoint) is missing or
    /// unreadable. Raised before any filesystem mutation.
    #[error("missing required artifact '{}'", .0.display())]
    MissingRequiredArtifact(PathBuf),

    /// One or more mandatory external tools are not installed on the host.
    /// The message lists each missing tool with the package that provides it.
    #[error("missing required host tools:\n{0}")]
    MissingRequiredTool(String),

    /// The external archiver exited non-zero. Carries its diagnostic output.
    #[error("dpkg-deb failed ({status}): {output}")]
    ArchiveBuildFailed { status: String, output: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn failing_stage() -> anyhow::Result<()> {
        bail!(BuildError::MissingRequiredArtifact(PathBuf::from(
            "/tmp/nope"
        )))
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err = failing_stage().unwrap_err();
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::MissingRequiredArtifact(path)) => {
                assert_eq!(path, &PathBuf::from("/tmp/nope"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_display_names_the_path() {
        let err = BuildError::MissingRequiredArtifact(PathBuf::from("/a/b"));
        assert!(err.to_string().contains("/a/b"));
    }
}
