//! Binary lifecycle: install the release binary for a platform and run it.

mod install;

use anyhow::Result;
use log::{debug, info, warn};
use semver::Version;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    config::LauncherConfig,
    error::LauncherError,
    http::{HttpClient, RetryPolicy},
    platform::PlatformDescriptor,
    runtime::Runtime,
    template::ReleaseCoordinates,
};

use install::{InstallRequest, stage_and_install};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Absent,
    Installed,
}

/// The cached executable for one version and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub version: Version,
    pub target_triple: &'static str,
}

pub struct Launcher<R: Runtime, E: ArchiveExtractor> {
    config: LauncherConfig,
    runtime: Arc<R>,
    http_client: HttpClient,
    extractor: Arc<E>,
}

impl<R: Runtime + 'static> Launcher<R, ArchiveExtractorImpl> {
    /// Build a launcher with the production HTTP client and extractors.
    pub fn from_config(config: LauncherConfig, runtime: R) -> Result<Self> {
        let http_client = HttpClient::with_user_agent(&config.user_agent)?
            .with_retry_policy(RetryPolicy::new(config.download_retries));
        Ok(Self::new(
            config,
            runtime,
            http_client,
            ArchiveExtractorImpl::new(),
        ))
    }
}

impl<R: Runtime + 'static, E: ArchiveExtractor + 'static> Launcher<R, E> {
    pub fn new(config: LauncherConfig, runtime: R, http_client: HttpClient, extractor: E) -> Self {
        Self {
            config,
            runtime: Arc::new(runtime),
            http_client,
            extractor: Arc::new(extractor),
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn download_url(&self, platform: &PlatformDescriptor) -> String {
        self.config.template.render(ReleaseCoordinates {
            version: &self.config.version,
            platform,
        })
    }

    pub fn install_path(&self, platform: &PlatformDescriptor) -> PathBuf {
        self.config.install_dir.join(&platform.binary_file_name)
    }

    pub fn state(&self, platform: &PlatformDescriptor) -> InstallState {
        if self.runtime.is_file(&self.install_path(platform)) {
            InstallState::Installed
        } else {
            InstallState::Absent
        }
    }

    /// Install the binary for `platform`.
    ///
    /// Without `force` an existing binary is kept as is and no request is
    /// made. On failure the final path is left exactly as it was. Ctrl-C
    /// stops the install with [`LauncherError::Interrupted`].
    #[tracing::instrument(skip(self, platform), fields(target = platform.target_triple))]
    pub async fn install(
        &self,
        platform: &PlatformDescriptor,
        force: bool,
    ) -> Result<InstalledBinary, LauncherError> {
        self.install_until(platform, force, ctrl_c()).await
    }

    async fn install_until(
        &self,
        platform: &PlatformDescriptor,
        force: bool,
        interrupt: impl Future<Output = ()>,
    ) -> Result<InstalledBinary, LauncherError> {
        let final_path = self.install_path(platform);
        if !force && self.state(platform) == InstallState::Installed {
            debug!("{:?} is already installed", final_path);
            return Ok(self.installed(platform, final_path));
        }

        let url = self.download_url(platform);
        eprintln!(
            " installing {} v{} ({}) from {}",
            self.config.name, self.config.version, platform.target_triple, url
        );

        stage_and_install(
            &self.runtime,
            &self.http_client,
            &self.extractor,
            InstallRequest {
                url: &url,
                platform,
                install_dir: &self.config.install_dir,
                final_path: &final_path,
            },
            async {
                interrupt.await;
                eprintln!("\nInterrupted, cleaning up...");
            },
        )
        .await?;

        info!("Installed {:?}", final_path);
        Ok(self.installed(platform, final_path))
    }

    pub async fn ensure_installed(
        &self,
        platform: &PlatformDescriptor,
    ) -> Result<InstalledBinary, LauncherError> {
        self.install(platform, false).await
    }

    /// Install if needed, then run the binary with `args` and return its exit
    /// code. A non-zero exit code is not an error.
    #[tracing::instrument(skip(self, platform, args))]
    pub async fn run(
        &self,
        platform: &PlatformDescriptor,
        args: &[OsString],
    ) -> Result<i32, LauncherError> {
        let binary = self.ensure_installed(platform).await?;

        debug!("Running {:?} with {} argument(s)", binary.path, args.len());
        self.runtime
            .exec_passthrough(&binary.path, args)
            .await
            .map_err(|source| LauncherError::SpawnFailure {
                path: binary.path.clone(),
                source,
            })
    }

    fn installed(&self, platform: &PlatformDescriptor, path: PathBuf) -> InstalledBinary {
        InstalledBinary {
            path,
            version: self.config.version.clone(),
            target_triple: platform.target_triple,
        }
    }
}

/// Resolves on the first Ctrl-C; never, if no handler can be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
