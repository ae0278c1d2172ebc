use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

/// Streams a release archive into `dest`, returning the number of bytes written.
///
/// `dest` is created (or truncated) only once the server has answered with a
/// success status.
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn fetch_archive<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    let dest = dest.to_path_buf();
    let bytes = http_client
        .download(url, || {
            runtime
                .create_file(&dest)
                .with_context(|| format!("Failed to create download file at {:?}", dest))
        })
        .await?;

    debug!("Fetched {} bytes into {:?}", bytes, dest);
    Ok(bytes)
}
