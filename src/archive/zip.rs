use crate::runtime::Runtime;
use log::debug;
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveExtractor, ExtractError, copy_entry};

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn extract_entry<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        entry_name: &str,
        dest: &Path,
    ) -> Result<(), ExtractError> {
        debug!("Looking for {:?} in {:?}...", entry_name, archive_path);
        let mut file = runtime
            .open(archive_path)
            .map_err(ExtractError::filesystem(archive_path))?;

        // zip crate requires Read + Seek, but Runtime::open returns Box<dyn Read + Send>
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| ExtractError::filesystem(archive_path)(e.into()))?;

        let mut archive =
            ZipArchive::new(std::io::Cursor::new(buffer)).map_err(ExtractError::malformed)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(ExtractError::malformed)?;
            if !entry.is_file() {
                continue;
            }

            let matches = entry
                .enclosed_name()
                .is_some_and(|path| path.file_name() == Some(OsStr::new(entry_name)));
            if !matches {
                continue;
            }

            debug!("Extracting {:?} to {:?}", entry.name(), dest);
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
