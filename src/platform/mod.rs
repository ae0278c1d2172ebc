//! Platform resolution.
//!
//! Maps the host operating system and CPU architecture onto the release
//! artifact built for it. The supported set is a compile-time table; lookup
//! is a pure function with no I/O.

mod detection;

use std::fmt;

use crate::error::LauncherError;

pub use detection::{DefaultPlatformDetector, HostPlatform, PlatformDetector};

#[cfg(test)]
pub use detection::MockPlatformDetector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsType {
    Windows,
    Linux,
    MacOs,
}

impl OsType {
    /// Parse an OS name as reported by `std::env::consts::OS`.
    pub fn parse(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(OsType::Windows),
            "linux" => Some(OsType::Linux),
            "macos" => Some(OsType::MacOs),
            _ => None,
        }
    }

    /// Suffix the platform expects on executable file names.
    pub fn exe_suffix(self) -> &'static str {
        match self {
            OsType::Windows => ".exe",
            OsType::Linux | OsType::MacOs => "",
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OsType::Windows => "Windows",
            OsType::Linux => "Linux",
            OsType::MacOs => "macOS",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    /// Parse an architecture name as reported by `std::env::consts::ARCH`.
    pub fn parse(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" => Some(Arch::X64),
            "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        })
    }
}

/// One row of the supported-platform table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformSpec {
    pub os: OsType,
    pub arch: Arch,
    pub target_triple: &'static str,
}

/// Platforms a release is published for.
///
/// Apple silicon runs the x86_64 build under Rosetta; no native arm64 macOS
/// artifact is published.
pub const SUPPORTED_PLATFORMS: &[PlatformSpec] = &[
    PlatformSpec {
        os: OsType::Windows,
        arch: Arch::X64,
        target_triple: "x86_64-windows",
    },
    PlatformSpec {
        os: OsType::Linux,
        arch: Arch::X64,
        target_triple: "x86_64-linux",
    },
    PlatformSpec {
        os: OsType::MacOs,
        arch: Arch::X64,
        target_triple: "x86_64-macos",
    },
    PlatformSpec {
        os: OsType::MacOs,
        arch: Arch::Arm64,
        target_triple: "x86_64-macos",
    },
];

/// The artifact selection for one platform and binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: OsType,
    pub arch: Arch,
    pub target_triple: &'static str,
    pub binary_file_name: String,
}

impl PlatformSpec {
    fn describe(&self, binary: &str) -> PlatformDescriptor {
        PlatformDescriptor {
            os: self.os,
            arch: self.arch,
            target_triple: self.target_triple,
            binary_file_name: format!("{}{}", binary, self.os.exe_suffix()),
        }
    }
}

/// Look up the descriptor for `(os, arch)`.
///
/// `binary` is the bare executable name; the OS suffix is appended here.
pub fn resolve(os: OsType, arch: Arch, binary: &str) -> Result<PlatformDescriptor, LauncherError> {
    SUPPORTED_PLATFORMS
        .iter()
        .find(|spec| spec.os == os && spec.arch == arch)
        .map(|spec| spec.describe(binary))
        .ok_or_else(|| unsupported(binary, &os.to_string(), &arch.to_string()))
}

/// Detect the host platform and resolve it.
#[tracing::instrument(skip(detector))]
pub fn resolve_host(
    detector: &dyn PlatformDetector,
    binary: &str,
) -> Result<PlatformDescriptor, LauncherError> {
    let host = detector.detect();
    log::debug!("Detected host platform {}/{}", host.os, host.arch);

    match (OsType::parse(&host.os), Arch::parse(&host.arch)) {
        (Some(os), Some(arch)) => resolve(os, arch, binary),
        _ => Err(unsupported(binary, &host.os, &host.arch)),
    }
}

fn unsupported(binary: &str, os: &str, arch: &str) -> LauncherError {
    LauncherError::UnsupportedPlatform {
        name: binary.to_string(),
        os: os.to_string(),
        arch: arch.to_string(),
        supported: SUPPORTED_PLATFORMS,
    }
}

/// Render the supported set as an aligned text table.
pub fn render_platform_table(specs: &[PlatformSpec], binary: &str) -> String {
    let header = ["TYPE", "ARCHITECTURE", "TARGET", "BINARY"];
    let rows: Vec<[String; 4]> = specs
        .iter()
        .map(|spec| {
            [
                spec.os.to_string(),
                spec.arch.to_string(),
                spec.target_triple.to_string(),
                spec.describe(binary).binary_file_name,
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let format_row = |cells: [&str; 4]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        format_row(header),
        format_row(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str)),
    ];
    for row in &rows {
        out.push(format_row(row.each_ref().map(String::as_str)));
    }
    out.join("\n")
}
