use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Platform {
    #[serde(rename = "darwin")]
    Darwin,
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "windows")]
    Windows,
}

impl Platform {
    /// Name used in release artifact filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Platform::Windows => ArchiveFormat::Zip,
            Platform::Darwin | Platform::Linux => ArchiveFormat::TarGz,
        }
    }

    pub fn executable_name(&self, tool: &str) -> String {
        match self {
            Platform::Windows => format!("{}.exe", tool),
            Platform::Darwin | Platform::Linux => tool.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Arch {
    #[serde(rename = "amd64")]
    Amd64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Raw OS-reported host values, before they are mapped onto the support matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

/// The release to install: a version plus a supported (platform, arch) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub version: semver::Version,
    pub platform: Platform,
    pub arch: Arch,
}

/// Where releases are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// Scheme and host, e.g. `https://github.com`.
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub filename: String,
    pub url: String,
    pub format: ArchiveFormat,
    pub expected_checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// No verification. Installing without one is logged as a trust decision.
    #[default]
    Skip,
    /// Hex SHA-256 known ahead of time.
    Pinned(String),
    /// Look the digest up in the release's checksums manifest.
    Manifest,
}

/// Directory owned by the launcher holding the single active binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    dir: PathBuf,
}

impl InstallRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn executable_path(&self, tool: &str, platform: Platform) -> PathBuf {
        self.dir.join(platform.executable_name(tool))
    }

    pub fn receipt_path(&self) -> PathBuf {
        self.dir.join(crate::receipt::RECEIPT_FILE_NAME)
    }
}

/// One invocation's worth of arguments and environment for the child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchRequest {
    pub argv: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl LaunchRequest {
    /// Captures the current process's arguments (minus argv[0]) and environment.
    pub fn from_current_process() -> Self {
        Self {
            argv: std::env::args_os().skip(1).collect(),
            env: std::env::vars_os().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
}
