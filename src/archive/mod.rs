mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Archive name suffixes the extractors understand, longest first.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("archive does not contain `{0}`")]
    MissingEntry(String),

    #[error("malformed archive")]
    Malformed(#[source] anyhow::Error),

    #[error("failed to access {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ExtractError {
    fn malformed(e: impl Into<anyhow::Error>) -> Self {
        ExtractError::Malformed(e.into())
    }

    fn filesystem(path: &Path) -> impl FnOnce(anyhow::Error) -> Self + '_ {
        move |source| ExtractError::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Suffix of the archive a URL points at, ignoring any query string.
pub fn archive_suffix(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    ARCHIVE_SUFFIXES
        .iter()
        .copied()
        .find(|suffix| path.ends_with(suffix))
}

/// Trait for format-specific archive extractors
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Write the first regular file named `entry_name` (at any depth) to `dest`.
    fn extract_entry<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<(), ExtractError>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
/// Holds all available extractors and dispatches to the correct one.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime, archive_path, dest))]
    fn extract_entry<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<(), ExtractError> {
        if self.tar_gz.can_handle(archive_path) {
            return self
                .tar_gz
                .extract_entry(runtime, archive_path, entry_name, dest);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract_entry(runtime, archive_path, entry_name, dest);
        }
        Err(ExtractError::UnsupportedFormat(
            archive_path.display().to_string(),
        ))
    }
}

/// Copy an archive entry into the destination writer, keeping read errors
/// (bad archive) apart from write errors (bad destination).
fn copy_entry(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    dest: &Path,
) -> Result<u64, ExtractError> {
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractError::malformed(e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| ExtractError::filesystem(dest)(e.into()))?;
        total += n as u64;
    }
    writer
        .flush()
        .map_err(|e| ExtractError::filesystem(dest)(e.into()))?;
    Ok(total)
}
