//! Package manifest and launcher configuration.
//!
//! The manifest (`prebuilt.json`) ships next to the launcher executable and
//! declares which release the launcher fronts. Environment variables can
//! point at a different manifest or install directory.

use log::debug;
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::runtime::Runtime;
use crate::template::{DEFAULT_HOST, DEFAULT_URL_TEMPLATE, PackageVars, ReleaseTemplate};

pub const MANIFEST_FILE_NAME: &str = "prebuilt.json";
pub const ENV_MANIFEST: &str = "PREBUILT_MANIFEST";
pub const ENV_INSTALL_DIR: &str = "PREBUILT_INSTALL_DIR";

/// Install directory, relative to the manifest, when the manifest names none.
pub const DEFAULT_INSTALL_DIR: &str = "bin";

/// User agent sent with every download.
pub const DEFAULT_USER_AGENT: &str = concat!("prebuilt/", env!("PREBUILT_VERSION"));

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

/// On-disk manifest as written by the package author.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default)]
    pub install_dir: Option<PathBuf>,
    #[serde(default)]
    pub download_retries: usize,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Manifest {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self, ConfigError> {
        let content = runtime
            .read_to_string(path)
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Command-line overrides; `None` falls back to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub manifest: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
}

/// Validated configuration injected into the launcher.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub name: String,
    pub binary: String,
    pub version: Version,
    pub template: ReleaseTemplate,
    pub install_dir: PathBuf,
    pub download_retries: usize,
    pub user_agent: String,
}

impl LauncherConfig {
    /// Locate, read and validate the manifest.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let manifest_path = match overrides.manifest {
            Some(path) => path,
            None => locate_manifest(runtime)?,
        };
        if !runtime.exists(&manifest_path) {
            return Err(ConfigError::ManifestNotFound(manifest_path));
        }
        debug!("Loading manifest {:?}", manifest_path);

        let manifest = Manifest::load(runtime, &manifest_path)?;
        let install_dir = overrides
            .install_dir
            .or_else(|| runtime.env_var(ENV_INSTALL_DIR).ok().map(PathBuf::from));
        let base_dir = manifest_path.parent().unwrap_or(Path::new("."));

        Self::from_manifest(manifest, base_dir, install_dir)
    }

    /// Validate a parsed manifest. A relative `install_dir` in the manifest
    /// is resolved against `base_dir`, which also holds the default `bin`.
    pub fn from_manifest(
        manifest: Manifest,
        base_dir: &Path,
        install_dir_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let name = manifest.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyField("name"));
        }

        let binary = manifest.binary.unwrap_or_else(|| name.clone());
        if binary.is_empty() {
            return Err(ConfigError::EmptyField("binary"));
        }
        if binary.contains(['/', '\\']) || binary == "." || binary == ".." {
            return Err(ConfigError::InvalidBinaryName(binary));
        }

        let raw_version = manifest.version.trim();
        let version = Version::parse(raw_version.strip_prefix('v').unwrap_or(raw_version))
            .map_err(|source| ConfigError::InvalidVersion {
                version: manifest.version.clone(),
                source,
            })?;

        let template = ReleaseTemplate::new(
            &manifest.url_template,
            PackageVars {
                host: manifest.host,
                repository: manifest.repository.filter(|r| !r.trim().is_empty()),
                name: name.clone(),
            },
        )?;

        let install_dir = match (install_dir_override, manifest.install_dir) {
            (Some(dir), _) => dir,
            (None, Some(dir)) if dir.is_absolute() => dir,
            (None, Some(dir)) => base_dir.join(dir),
            (None, None) => base_dir.join(DEFAULT_INSTALL_DIR),
        };

        Ok(Self {
            name,
            binary,
            version,
            template,
            install_dir,
            download_retries: manifest.download_retries,
            user_agent: manifest
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

/// `$PREBUILT_MANIFEST`, else `prebuilt.json` beside the running executable.
fn locate_manifest<R: Runtime>(runtime: &R) -> Result<PathBuf, ConfigError> {
    if let Ok(path) = runtime.env_var(ENV_MANIFEST) {
        return Ok(PathBuf::from(path));
    }
    let exe = runtime.current_exe().map_err(|source| ConfigError::Read {
        path: PathBuf::from(MANIFEST_FILE_NAME),
        source,
    })?;
    let dir = exe.parent().unwrap_or(Path::new("."));
    Ok(dir.join(MANIFEST_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_package_dir;
    use mockall::predicate::eq;
    use std::env::VarError;

    const MANIFEST: &str = r#"{
        "name": "share",
        "version": "0.0.3",
        "repository": "wokenuild/share",
        "install_dir": "bin"
    }"#;

    fn manifest(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_manifest_defaults() {
        let m = manifest(r#"{"name": "scs", "version": "1.2.3"}"#);
        assert_eq!(m.binary, None);
        assert_eq!(m.host, "github.com");
        assert_eq!(m.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(m.download_retries, 0);
    }

    #[test]
    fn test_manifest_rejects_unknown_fields() {
        let result: Result<Manifest, _> =
            serde_json::from_str(r#"{"name": "scs", "version": "1.2.3", "verison": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_env_manifest() {
        let manifest_path = test_package_dir().join("prebuilt.json");
        let mut runtime = MockRuntime::new();
        let env_path = manifest_path.clone();
        runtime
            .expect_env_var()
            .with(eq(ENV_MANIFEST))
            .returning(move |_| Ok(env_path.to_string_lossy().into_owned()));
        runtime
            .expect_env_var()
            .with(eq(ENV_INSTALL_DIR))
            .returning(|_| Err(VarError::NotPresent));
        runtime
            .expect_exists()
            .with(eq(manifest_path.clone()))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(manifest_path.clone()))
            .returning(|_| Ok(MANIFEST.to_string()));

        let config = LauncherConfig::load(&runtime, ConfigOverrides::default()).unwrap();

        assert_eq!(config.name, "share");
        assert_eq!(config.binary, "share");
        assert_eq!(config.version, Version::new(0, 0, 3));
        assert_eq!(config.install_dir, test_package_dir().join("bin"));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_load_next_to_executable() {
        let exe = test_package_dir().join("share");
        let manifest_path = test_package_dir().join(MANIFEST_FILE_NAME);
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .returning(|_| Err(VarError::NotPresent));
        runtime.expect_current_exe().returning(move || Ok(exe.clone()));
        runtime
            .expect_exists()
            .with(eq(manifest_path.clone()))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok(MANIFEST.to_string()));

        let config = LauncherConfig::load(&runtime, ConfigOverrides::default()).unwrap();
        assert_eq!(config.install_dir, test_package_dir().join("bin"));
    }

    #[test]
    fn test_load_missing_manifest() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let err = LauncherConfig::load(
            &runtime,
            ConfigOverrides {
                manifest: Some(PathBuf::from("/nowhere/prebuilt.json")),
                install_dir: None,
            },
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ManifestNotFound(_)));
        assert!(err.to_string().contains("PREBUILT_MANIFEST"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{ not json".to_string()));

        let err = LauncherConfig::load(
            &runtime,
            ConfigOverrides {
                manifest: Some(PathBuf::from("/pkg/prebuilt.json")),
                install_dir: Some(PathBuf::from("/cache")),
            },
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_install_dir_override_wins() {
        let config = LauncherConfig::from_manifest(
            manifest(MANIFEST),
            &test_package_dir(),
            Some(PathBuf::from("/cache/share")),
        )
        .unwrap();
        assert_eq!(config.install_dir, PathBuf::from("/cache/share"));
    }

    #[test]
    fn test_default_install_dir_is_package_bin() {
        let config = LauncherConfig::from_manifest(
            manifest(r#"{"name": "scs", "version": "v0.1.0", "repository": "o/r"}"#),
            &test_package_dir(),
            None,
        )
        .unwrap();

        assert_eq!(config.version, Version::new(0, 1, 0));
        assert_eq!(config.install_dir, test_package_dir().join("bin"));
    }

    #[test]
    fn test_invalid_version() {
        let err = LauncherConfig::from_manifest(
            manifest(r#"{"name": "scs", "version": "latest", "repository": "o/r"}"#),
            &test_package_dir(),
            Some(PathBuf::from("/cache")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));
    }

    #[test]
    fn test_invalid_binary_name() {
        let err = LauncherConfig::from_manifest(
            manifest(r#"{"name": "scs", "version": "1.0.0", "binary": "../scs", "repository": "o/r"}"#),
            &test_package_dir(),
            Some(PathBuf::from("/cache")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBinaryName(_)));
    }

    #[test]
    fn test_empty_name() {
        let err = LauncherConfig::from_manifest(
            manifest(r#"{"name": "  ", "version": "1.0.0"}"#),
            &test_package_dir(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyField("name")));
    }

    #[test]
    fn test_template_requires_repository() {
        let err = LauncherConfig::from_manifest(
            manifest(r#"{"name": "scs", "version": "1.0.0", "repository": ""}"#),
            &test_package_dir(),
            Some(PathBuf::from("/cache")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_custom_template_and_binary() {
        let config = LauncherConfig::from_manifest(
            manifest(
                r#"{
                    "name": "secure-share",
                    "binary": "scs",
                    "version": "0.1.0",
                    "url_template": "https://dl.example.com/{name}/{version}/{target}.zip",
                    "download_retries": 2,
                    "user_agent": "scs-npm"
                }"#,
            ),
            &test_package_dir(),
            Some(PathBuf::from("/cache")),
        )
        .unwrap();

        assert_eq!(config.binary, "scs");
        assert_eq!(config.download_retries, 2);
        assert_eq!(config.user_agent, "scs-npm");
        assert_eq!(
            config.template.as_str(),
            "https://dl.example.com/{name}/{version}/{target}.zip"
        );
    }
}
