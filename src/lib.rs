pub mod archive;
pub mod cleanup;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod launcher;
pub mod platform;
pub mod runtime;
pub mod template;

/// Test utilities for cross-platform path handling.
#[cfg(test)]
pub mod test_utils {
    use std::path::PathBuf;

    /// Returns a test home directory path based on the platform.
    /// - Unix: `/home/user`
    /// - Windows: `C:\Users\user`
    pub fn test_home() -> PathBuf {
        #[cfg(not(windows))]
        {
            PathBuf::from("/home/user")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\Users\user")
        }
    }

    /// Returns the directory an npm-style package unpacked the launcher into.
    /// - Unix: `/home/user/project/node_modules/share`
    /// - Windows: `C:\Users\user\project\node_modules\share`
    pub fn test_package_dir() -> PathBuf {
        test_home()
            .join("project")
            .join("node_modules")
            .join("share")
    }

    /// Returns the install directory used by launcher tests.
    pub fn test_install_dir() -> PathBuf {
        test_package_dir().join("bin")
    }
}
