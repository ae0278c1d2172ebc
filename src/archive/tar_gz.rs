use crate::runtime::Runtime;
use flate2::read::GzDecoder;
use log::debug;
use std::ffi::OsStr;
use std::path::Path;
use tar::Archive;

use super::{ArchiveExtractor, ExtractError, copy_entry};

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract_entry<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<(), ExtractError> {
        debug!("Looking for {:?} in {:?}...", entry_name, archive_path);
        let file = runtime
            .open(archive_path)
            .map_err(ExtractError::filesystem(archive_path))?;

        let mut archive = Archive::new(GzDecoder::new(file));
        let entries = archive.entries().map_err(ExtractError::malformed)?;

        for entry in entries {
            let mut entry = entry.map_err(ExtractError::malformed)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let matches = entry
                .path()
                .map_err(ExtractError::malformed)?
                .file_name()
                == Some(OsStr::new(entry_name));
            if !matches {
                continue;
            }

            debug!(
                "Extracting {:?} to {:?}",
                entry.path().map_err(ExtractError::malformed)?,
                dest
            );
            let mut out = runtime
                .create_file(dest)
                .map_err(ExtractError::filesystem(dest))?;
            let bytes = copy_entry(&mut entry, &mut out, dest)?;
            debug!("Extracted {} bytes", bytes);
            return Ok(());
        }

        Err(ExtractError::MissingEntry(entry_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_can_handle_tar_gz() {
        assert!(TarGzExtractor.can_handle(Path::new("file.tar.gz")));
        assert!(TarGzExtractor.can_handle(Path::new("FILE.TGZ")));
        assert!(!TarGzExtractor.can_handle(Path::new("file.zip")));
        assert!(!TarGzExtractor.can_handle(Path::new("file.tar")));
    }

    #[test]
    fn test_extract_top_level_entry() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        fs::write(
            &archive,
            test_support::tar_gz(&[
                ("README.md", b"docs", 0o644),
                ("share", b"binary", 0o755),
            ]),
        )
        .unwrap();
        let dest = dir.path().join("out");

        TarGzExtractor
            .extract_entry(&RealRuntime, &archive, "share", &dest)
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"binary");
    }

    #[test]
    fn test_extract_nested_entry_and_ignores_similar_names() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        fs::write(
            &archive,
            test_support::tar_gz(&[
                ("share-v1/share.sha256", b"digest", 0o644),
                ("share-v1/bin/share", b"nested binary", 0o755),
            ]),
        )
        .unwrap();
        let dest = dir.path().join("out");

        TarGzExtractor
            .extract_entry(&RealRuntime, &archive, "share", &dest)
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"nested binary");
    }

    #[test]
    fn test_missing_entry() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        fs::write(
            &archive,
            test_support::tar_gz(&[("other-tool", b"x", 0o755)]),
        )
        .unwrap();
        let dest = dir.path().join("out");

        let err = TarGzExtractor
            .extract_entry(&RealRuntime, &archive, "share", &dest)
            .unwrap_err();

        assert!(matches!(err, ExtractError::MissingEntry(ref name) if name == "share"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.tar.gz");
        fs::write(&archive, b"<html>Not Found</html>").unwrap();

        let err = TarGzExtractor
            .extract_entry(&RealRuntime, &archive, "share", &dir.path().join("out"))
            .unwrap_err();

        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_open_failure_is_filesystem_error() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_open()
            .returning(|_| Err(anyhow::anyhow!("Permission denied")));

        let err = TarGzExtractor
            .extract_entry(
                &runtime,
                Path::new("/x/a.tar.gz"),
                "share",
                Path::new("/x/out"),
            )
            .unwrap_err();

        assert!(matches!(err, ExtractError::Filesystem { .. }));
    }
}
