//! Error taxonomy for platform resolution, installation and execution.
//!
//! Everything below the launcher boundary uses `anyhow`; these types exist so
//! a caller can tell the failure categories apart and report them.

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::{PlatformSpec, render_platform_table};

/// Failures of the binary lifecycle: resolve, install, run.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// No descriptor for the detected OS/architecture.
    #[error(
        "Platform with type \"{os}\" and architecture \"{arch}\" is not supported by {name}.\nYour system must be one of the following:\n\n{}",
        render_platform_table(.supported, .name)
    )]
    UnsupportedPlatform {
        name: String,
        os: String,
        arch: String,
        supported: &'static [PlatformSpec],
    },

    /// Transport or HTTP failure while fetching the release archive.
    #[error("Failed to download {url} (target {target})")]
    DownloadFailure {
        url: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    /// The archive could not be read, or it does not contain the binary.
    #[error("Release archive {url} is unusable for {binary}: {reason}")]
    ArchiveFormatFailure {
        url: String,
        binary: String,
        reason: String,
    },

    /// Creating, writing, renaming or chmod-ing something on disk failed.
    #[error("Failed to {action} {}", .path.display())]
    FilesystemFailure {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Ctrl-C arrived before the binary was moved into place.
    #[error("Installation interrupted")]
    Interrupted,

    /// The cached binary is missing, not executable, or could not be started.
    #[error("Failed to execute {} (reinstall to repair)", .path.display())]
    SpawnFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LauncherError {
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: anyhow::Error,
    ) -> Self {
        LauncherError::FilesystemFailure {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Exit status after Ctrl-C, as a shell reports SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Exit status for an error that ends `prebuilt` or `prebuilt-install`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LauncherError>() {
        Some(LauncherError::Interrupted) => INTERRUPTED_EXIT_CODE,
        _ => 1,
    }
}

/// Problems with the package manifest or environment overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No manifest found at {}; set PREBUILT_MANIFEST to its location", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Failed to read manifest {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid manifest {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("Binary name \"{0}\" must be a bare file name")]
    InvalidBinaryName(String),

    #[error("Version \"{version}\" is not a semantic version")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid release URL template \"{template}\": {reason}")]
    InvalidTemplate { template: String, reason: String },
}
