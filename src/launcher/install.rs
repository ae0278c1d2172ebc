use log::debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    archive::{ARCHIVE_SUFFIXES, ArchiveExtractor, ExtractError, archive_suffix},
    cleanup::StagedFile,
    download::fetch_archive,
    error::LauncherError,
    http::{HttpClient, HttpStatusError},
    platform::PlatformDescriptor,
    runtime::Runtime,
};

/// Mode given to the installed executable.
pub(crate) const BINARY_MODE: u32 = 0o755;

/// Everything one install attempt needs to know about where things go.
pub(crate) struct InstallRequest<'a> {
    pub url: &'a str,
    pub platform: &'a PlatformDescriptor,
    pub install_dir: &'a Path,
    pub final_path: &'a Path,
}

/// Download, extract and move the binary into place.
///
/// Both staging files live inside the install directory, are named after the
/// current process, and are removed on every exit path except the one that
/// renames the extracted binary onto `final_path`.
///
/// When `interrupt` resolves the install stops with
/// [`LauncherError::Interrupted`]. A download is dropped on the spot; an
/// extraction already running is allowed to finish but the rename is skipped.
#[tracing::instrument(skip_all, fields(url = request.url))]
pub(crate) async fn stage_and_install<R, E, I>(
    runtime: &Arc<R>,
    http_client: &HttpClient,
    extractor: &Arc<E>,
    request: InstallRequest<'_>,
    interrupt: I,
) -> Result<(), LauncherError>
where
    R: Runtime + 'static,
    E: ArchiveExtractor + 'static,
    I: Future<Output = ()>,
{
    let InstallRequest {
        url,
        platform,
        install_dir,
        final_path,
    } = request;
    let binary = platform.binary_file_name.as_str();

    let suffix = archive_suffix(url).ok_or_else(|| LauncherError::ArchiveFormatFailure {
        url: url.to_string(),
        binary: binary.to_string(),
        reason: format!(
            "unrecognised archive format, expected one of {}",
            ARCHIVE_SUFFIXES.join(", ")
        ),
    })?;

    debug!("Creating install directory: {:?}", install_dir);
    runtime
        .create_dir_all(install_dir)
        .map_err(|e| LauncherError::filesystem("create directory", install_dir, e))?;

    let mut interrupt = pin!(interrupt);
    let pid = std::process::id();
    let archive = StagedFile::new(
        runtime.as_ref(),
        install_dir.join(format!(".{}.{}.download{}", binary, pid, suffix)),
    );
    let staged_binary = StagedFile::new(
        runtime.as_ref(),
        install_dir.join(format!(".{}.{}.partial", binary, pid)),
    );

    tokio::select! {
        fetched = fetch_archive(runtime.as_ref(), url, archive.path(), http_client) => {
            fetched.map_err(|e| download_error(url, platform, archive.path(), e))?;
        }
        _ = &mut interrupt => return Err(LauncherError::Interrupted),
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let placement = Placement {
        url: url.to_string(),
        binary: binary.to_string(),
        archive: archive.path().to_path_buf(),
        staged: staged_binary.path().to_path_buf(),
        final_path: final_path.to_path_buf(),
        cancelled: Arc::clone(&cancelled),
    };
    let (runtime_handle, extractor_handle) = (Arc::clone(runtime), Arc::clone(extractor));
    let mut placing = tokio::task::spawn_blocking(move || {
        placement.run(runtime_handle.as_ref(), extractor_handle.as_ref())
    });

    let placed = tokio::select! {
        joined = &mut placing => joined,
        _ = &mut interrupt => {
            cancelled.store(true, Ordering::SeqCst);
            // The guards below may only run once the blocking half has let go
            // of the staging files.
            let _ = placing.await;
            return Err(LauncherError::Interrupted);
        }
    };
    placed.map_err(|e| LauncherError::filesystem("install", final_path, e.into()))??;
    staged_binary.commit();

    // Dropping the guard removes the downloaded archive.
    drop(archive);
    Ok(())
}

/// The blocking half of an install: extract, chmod, rename.
struct Placement {
    url: String,
    binary: String,
    archive: PathBuf,
    staged: PathBuf,
    final_path: PathBuf,
    cancelled: Arc<AtomicBool>,
}

impl Placement {
    fn run<R: Runtime + 'static, E: ArchiveExtractor>(
        self,
        runtime: &R,
        extractor: &E,
    ) -> Result<(), LauncherError> {
        extractor
            .extract_entry(runtime, &self.archive, &self.binary, &self.staged)
            .map_err(|e| extract_error(&self.url, &self.binary, e))?;

        runtime
            .set_permissions(&self.staged, BINARY_MODE)
            .map_err(|e| LauncherError::filesystem("set permissions on", &self.staged, e))?;

        if self.cancelled.load(Ordering::SeqCst) {
            return Err(LauncherError::Interrupted);
        }

        debug!("Moving {:?} to {:?}", self.staged, self.final_path);
        runtime
            .rename(&self.staged, &self.final_path)
            .map_err(|e| LauncherError::filesystem("move binary into place at", &self.final_path, e))
    }
}

/// Network and HTTP status problems are download failures; anything else
/// went wrong while writing the staging archive.
fn download_error(
    url: &str,
    platform: &PlatformDescriptor,
    staging: &Path,
    e: anyhow::Error,
) -> LauncherError {
    let from_network = e
        .chain()
        .any(|cause| cause.is::<reqwest::Error>() || cause.is::<HttpStatusError>());
    if from_network {
        LauncherError::DownloadFailure {
            url: url.to_string(),
            target: platform.target_triple.to_string(),
            source: e,
        }
    } else {
        LauncherError::filesystem("write", staging, e)
    }
}

fn extract_error(url: &str, binary: &str, e: ExtractError) -> LauncherError {
    match e {
        ExtractError::Filesystem { path, source } => {
            LauncherError::filesystem("access", path, source)
        }
        other => LauncherError::ArchiveFormatFailure {
            url: url.to_string(),
            binary: binary.to_string(),
            reason: format!("{:#}", anyhow::Error::from(other)),
        },
    }
}
